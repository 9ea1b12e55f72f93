//! REST client module
//!
//! This module talks to the chat REST service:
//! - Paginated list envelopes
//! - Access credentials with refresh on expiry
//! - Authorized GETs of relative or absolute links
//!
//! Authentication itself is out of scope; the client only keeps an access
//! token fresh enough to authorize requests and stream connections.

use crate::pagination::{Page, PageSource};
use crate::store::Conversation;
use crate::{Error, Result};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Conversation list endpoint
pub const CONVERSATIONS_PATH: &str = "users/";
/// Online-users list endpoint
pub const ONLINE_USERS_PATH: &str = "users/?filter=online";

/// Access/refresh token pair returned by the refresh endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPair {
    /// Short-lived bearer token
    pub access: String,
    /// Long-lived refresh token
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Expiry (Unix seconds) of a JWT, if it carries one
///
/// Returns `Err` when the token is not a decodable JWT.
pub fn token_expiry(token: &str) -> Result<Option<i64>> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::Credentials("Token is not a JWT".to_string()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::Credentials(format!("Invalid token payload: {}", e)))?;
    let claims: Claims = serde_json::from_slice(&bytes)
        .map_err(|e| Error::Credentials(format!("Invalid token claims: {}", e)))?;
    Ok(claims.exp)
}

/// Whether a token is expired at `now` (Unix seconds)
///
/// Tokens without an `exp` claim never expire; undecodable tokens are
/// treated as expired.
pub fn is_token_expired(token: &str, now: i64) -> bool {
    match token_expiry(token) {
        Ok(Some(exp)) => now >= exp,
        Ok(None) => false,
        Err(e) => {
            warn!("Treating token as expired: {}", e);
            true
        }
    }
}

/// Access credential holder shared by the REST client and the stream
#[derive(Debug, Clone)]
pub struct CredentialStore {
    access: String,
    refresh: Option<String>,
    refresh_url: Option<Url>,
    http: reqwest::Client,
}

/// Credential store shared between tasks
pub type SharedCredentials = Arc<Mutex<CredentialStore>>;

impl CredentialStore {
    /// Create a store around an access token
    pub fn new(access: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: None,
            refresh_url: None,
            http: reqwest::Client::new(),
        }
    }

    /// Enable refreshing through `refresh_url`
    pub fn with_refresh(mut self, refresh: impl Into<String>, refresh_url: &str) -> Result<Self> {
        self.refresh = Some(refresh.into());
        self.refresh_url = Some(Url::parse(refresh_url)?);
        Ok(self)
    }

    /// Wrap the store for sharing
    pub fn shared(self) -> SharedCredentials {
        Arc::new(Mutex::new(self))
    }

    /// Current access token, possibly expired
    pub fn access(&self) -> &str {
        &self.access
    }

    /// Whether the access token is expired now
    pub fn is_expired(&self) -> bool {
        is_token_expired(&self.access, chrono::Utc::now().timestamp())
    }

    /// Access token, refreshed first if it has expired
    ///
    /// Without a refresh token the expired token is returned as is and the
    /// server gets to reject it.
    pub async fn fresh_access_token(&mut self) -> Result<String> {
        if self.is_expired() && self.refresh.is_some() {
            self.refresh().await?;
        }
        Ok(self.access.clone())
    }

    /// Exchange the refresh token for a new pair
    pub async fn refresh(&mut self) -> Result<()> {
        let (Some(refresh), Some(url)) = (self.refresh.clone(), self.refresh_url.clone()) else {
            return Err(Error::Credentials("No refresh token configured".to_string()));
        };

        debug!("Refreshing access token");
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "refresh": refresh }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Credentials(format!(
                "Refresh rejected ({}): {}",
                status.as_u16(),
                message
            )));
        }

        let pair: TokenPair = response.json().await?;
        self.access = pair.access;
        self.refresh = Some(pair.refresh);
        info!("Access token refreshed");
        Ok(())
    }
}

/// Authorized client of the chat REST service
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    credentials: SharedCredentials,
}

impl ApiClient {
    /// Create a client for a base URL such as `http://host/api/chat/`
    pub fn new(base_url: &str, credentials: SharedCredentials) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            credentials,
        })
    }

    /// Resolve a link: absolute links stay as they are, relative ones are
    /// taken relative to the base URL
    pub fn resolve(&self, link: &str) -> Result<Url> {
        match Url::parse(link) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(self.base.join(link.trim_start_matches('/'))?)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// GET a link and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, link: &str) -> Result<T> {
        let url = self.resolve(link)?;
        let token = self.credentials.lock().await.fresh_access_token().await?;

        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, format!("JWT {}", token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    /// Fetch the conversation record of a room
    pub async fn fetch_room_user(&self, room: &str) -> Result<Conversation> {
        self.get_json(&room_user_path(room)).await
    }
}

#[async_trait]
impl<T> PageSource<T> for ApiClient
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(&self, link: &str) -> Result<Page<T>> {
        self.get_json(link).await
    }
}

/// Endpoint of a room's conversation record
pub fn room_user_path(room: &str) -> String {
    format!("users/{}/user/", room)
}

/// First page of a room's message history
pub fn messages_path(room: &str) -> String {
    format!("messages/{}/", room)
}
