//! Pagination module
//!
//! Cursor-style pagination over the REST list envelopes. A [`Paginator`]
//! remembers the next-page link and whether a request is in flight, so at
//! most one page is loading at a time and a failed page can be retried.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One page of a list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    /// Total number of items across all pages
    #[serde(default)]
    pub count: u64,
    /// Link to the next page, absent on the last one
    #[serde(default)]
    pub next: Option<String>,
    /// Link to the previous page
    #[serde(default)]
    pub previous: Option<String>,
    /// Items of this page
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// A page with no following page
    pub fn last(results: Vec<T>) -> Self {
        Self {
            count: results.len() as u64,
            next: None,
            previous: None,
            results,
        }
    }
}

/// Something that can fetch a page by link
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Fetch the page at `link`
    async fn fetch_page(&self, link: &str) -> Result<Page<T>>;
}

/// Where a paginated list is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    /// Nothing requested yet
    Unstarted,
    /// More pages behind this link
    Next(String),
    /// Last page seen
    Exhausted,
}

/// Pagination cursor for one list endpoint
#[derive(Debug, Clone)]
pub struct Paginator {
    initial_link: String,
    cursor: Cursor,
    /// Link of the request in flight
    loading: Option<String>,
    error: Option<String>,
}

impl Paginator {
    /// Create a paginator starting at `initial_link`
    pub fn new(initial_link: impl Into<String>) -> Self {
        Self {
            initial_link: initial_link.into(),
            cursor: Cursor::Unstarted,
            loading: None,
            error: None,
        }
    }

    /// Link of the first page
    pub fn initial_link(&self) -> &str {
        &self.initial_link
    }

    /// Whether a request is in flight
    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    /// Whether another page may be requested
    pub fn has_more(&self) -> bool {
        !matches!(self.cursor, Cursor::Exhausted)
    }

    /// Message of the last failed request, cleared by the next success
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Start loading the first page
    ///
    /// Returns the link to fetch, or `None` if a request is already in flight.
    pub fn begin_initial(&mut self) -> Option<String> {
        if self.is_loading() {
            return None;
        }
        self.cursor = Cursor::Unstarted;
        let link = self.initial_link.clone();
        self.loading = Some(link.clone());
        Some(link)
    }

    /// Start loading the next page
    ///
    /// Returns `None` while a request is in flight or when no page follows.
    /// Before the first page this behaves like [`Paginator::begin_initial`].
    pub fn begin_next(&mut self) -> Option<String> {
        if self.is_loading() {
            return None;
        }
        let link = match &self.cursor {
            Cursor::Unstarted => self.initial_link.clone(),
            Cursor::Next(link) => link.clone(),
            Cursor::Exhausted => return None,
        };
        self.loading = Some(link.clone());
        Some(link)
    }

    /// Finish the request in flight
    ///
    /// On success the cursor moves to the page's `next` link and the items
    /// are returned. On failure the cursor stays put, the error is recorded
    /// and the same page can be requested again.
    pub fn complete<T>(&mut self, result: Result<Page<T>>) -> Option<Vec<T>> {
        let link = self.loading.take()?;
        match result {
            Ok(page) => {
                debug!(
                    "Page {} loaded: {} items, more: {}",
                    link,
                    page.results.len(),
                    page.next.is_some()
                );
                self.error = None;
                self.cursor = match page.next {
                    Some(next) => Cursor::Next(next),
                    None => Cursor::Exhausted,
                };
                Some(page.results)
            }
            Err(e) => {
                warn!("Failed to load page {}: {}", link, e);
                self.error = Some(e.to_string());
                None
            }
        }
    }

    /// Fetch the first page through `source`
    pub async fn fetch_initial<T, S>(&mut self, source: &S) -> Result<Vec<T>>
    where
        S: PageSource<T> + ?Sized,
    {
        let link = self
            .begin_initial()
            .ok_or_else(|| Error::Pagination("A page is already loading".to_string()))?;
        self.finish(source.fetch_page(&link).await)
    }

    /// Fetch the next page through `source`
    ///
    /// Returns an empty list when the last page has already been seen.
    pub async fn fetch_next<T, S>(&mut self, source: &S) -> Result<Vec<T>>
    where
        S: PageSource<T> + ?Sized,
    {
        if !self.has_more() {
            return Ok(Vec::new());
        }
        let link = self
            .begin_next()
            .ok_or_else(|| Error::Pagination("A page is already loading".to_string()))?;
        self.finish(source.fetch_page(&link).await)
    }

    fn finish<T>(&mut self, result: Result<Page<T>>) -> Result<Vec<T>> {
        match result {
            Ok(page) => Ok(self.complete(Ok(page)).unwrap_or_default()),
            Err(e) => {
                if let Some(link) = self.loading.take() {
                    warn!("Failed to load page {}: {}", link, e);
                }
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

/// A paginated list that grows as pages arrive
///
/// Used for plain lists that only ever append (feed, comments, suggestions).
#[derive(Debug, Clone)]
pub struct PagedList<T> {
    paginator: Paginator,
    items: Vec<T>,
}

impl<T> PagedList<T> {
    /// Create an empty list starting at `initial_link`
    pub fn new(initial_link: impl Into<String>) -> Self {
        Self {
            paginator: Paginator::new(initial_link),
            items: Vec::new(),
        }
    }

    /// Items loaded so far
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// The underlying cursor
    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// Whether another page may be loaded
    pub fn has_more(&self) -> bool {
        self.paginator.has_more()
    }

    /// Load the first page, replacing anything loaded before
    pub async fn load_initial<S>(&mut self, source: &S) -> Result<usize>
    where
        S: PageSource<T> + ?Sized,
    {
        let page = self.paginator.fetch_initial(source).await?;
        let loaded = page.len();
        self.items = page;
        Ok(loaded)
    }

    /// Load the next page and append it
    ///
    /// # Returns
    /// Number of items appended (0 once the list is complete)
    pub async fn load_more<S>(&mut self, source: &S) -> Result<usize>
    where
        S: PageSource<T> + ?Sized,
    {
        let page = self.paginator.fetch_next(source).await?;
        let loaded = page.len();
        self.items.extend(page);
        Ok(loaded)
    }
}
