//! Socialchat CLI
//!
//! A line-based chat client over the socialchat engine. Type a message to
//! send it to the open conversation, or a command:
//!
//! - `/open <room>` open a conversation
//! - `/back` return to the messenger list
//! - `/more` load older history
//! - `/list` show conversations
//! - `/quit` exit

use anyhow::Context;
use clap::Parser;
use socialchat::api::{ApiClient, CredentialStore};
use socialchat::config::SettingsManager;
use socialchat::messaging::{dispatch_commands, flush_outbox, send_message};
use socialchat::session::ChatSession;
use socialchat::store::{Route, User};
use socialchat::transport::{ConnectionState, EventStream, StreamEvent, StreamHandle};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "socialchat", about = "Real-time chat and presence client")]
struct Cli {
    /// Settings file
    #[arg(long, default_value = "socialchat.json")]
    settings: String,

    /// Access token
    #[arg(long, env = "SOCIALCHAT_TOKEN")]
    token: String,

    /// Refresh token, enables refreshing the access token
    #[arg(long, env = "SOCIALCHAT_REFRESH_TOKEN")]
    refresh_token: Option<String>,

    /// Signed-in user id
    #[arg(long)]
    user_id: String,

    /// Signed-in user display name
    #[arg(long, default_value = "Me")]
    user_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    socialchat::init();
    let cli = Cli::parse();

    let manager = SettingsManager::new(&cli.settings)
        .await
        .context("Failed to load settings")?;
    let settings = manager.get_all().await;

    let mut credentials = CredentialStore::new(cli.token);
    if let Some(refresh) = cli.refresh_token {
        credentials = credentials.with_refresh(refresh, &settings.refresh_url)?;
    }
    let credentials = credentials.shared();

    let api = ApiClient::new(&settings.api_base_url, credentials.clone())?;
    let mut session = ChatSession::new(User::new(cli.user_id, cli.user_name), &settings);

    if let Err(e) = session.load_conversations(&api).await {
        warn!("Failed to load conversations: {}", e);
    }
    if let Err(e) = session.load_online(&api).await {
        warn!("Failed to load online users: {}", e);
    }
    session.navigate(Route::Messenger);
    print_list(&session);

    let mut stream = EventStream::connect(&settings.ws_url, settings.reconnect_policy(), credentials)?;
    let handle = stream.handle();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            event = stream.recv() => {
                let Some(event) = event else { break };
                let now = chrono::Utc::now().timestamp_millis();
                match event {
                    StreamEvent::State(state) => {
                        session.connection_changed(state, now);
                        match state {
                            ConnectionState::Open => {
                                println!("-- connected");
                                flush_outbox(&mut session, &handle, now).await?;
                            }
                            ConnectionState::Reconnecting { attempt } => {
                                println!("-- reconnecting (attempt {})", attempt);
                            }
                            ConnectionState::Closed => {
                                println!("-- disconnected");
                                break;
                            }
                            ConnectionState::Connecting => {}
                        }
                    }
                    StreamEvent::Event(event) => {
                        let commands = session.handle_event(event, now);
                        dispatch_commands(&handle, commands).await?;
                        print_view(&session, 1);
                        for notification in session.visible_notifications() {
                            println!(
                                "[{}] {}: {}",
                                notification.id(),
                                notification.message.user.full_name,
                                notification.message.content
                            );
                        }
                    }
                }
            }
            _ = ticker.tick() => {
                let now = chrono::Utc::now().timestamp_millis();
                let commands = session.tick(now);
                dispatch_commands(&handle, commands).await?;
                if session.connection() == ConnectionState::Open {
                    flush_outbox(&mut session, &handle, now).await?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !run_command(&mut session, &api, &handle, line.trim()).await? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    stream.close();
    info!("Bye");
    Ok(())
}

async fn run_command(
    session: &mut ChatSession,
    api: &ApiClient,
    handle: &StreamHandle,
    line: &str,
) -> anyhow::Result<bool> {
    match line.split_once(' ').unwrap_or((line, "")) {
        ("/quit", _) => return Ok(false),
        ("/list", _) => print_list(session),
        ("/back", _) => {
            let commands = session.navigate(Route::Messenger);
            dispatch_commands(handle, commands).await?;
        }
        ("/open", room) if !room.is_empty() => {
            let commands = session.navigate(Route::conversation(room));
            dispatch_commands(handle, commands).await?;
            let record = api.fetch_room_user(room).await;
            let commands = session.on_room_user(room, record);
            dispatch_commands(handle, commands).await?;
            if let Err(e) = session.load_history(api).await {
                warn!("Failed to load history: {}", e);
            }
            print_view(session, 20);
        }
        ("/more", _) => {
            match session.load_history(api).await {
                Ok(added) => println!("-- {} older messages", added),
                Err(e) => warn!("Failed to load history: {}", e),
            }
            print_view(session, 20);
        }
        ("", _) => {}
        _ => {
            if send_message(session, handle, line).await?.is_none() {
                println!("-- open a conversation first (/open <room>)");
            }
        }
    }
    Ok(true)
}

fn print_list(session: &ChatSession) {
    let state = session.state();
    println!("-- {} online", state.online_count());
    for conversation in &state.chat_users {
        println!(
            "{} {} ({}){}{}",
            if conversation.is_online() { "●" } else { "○" },
            conversation.friend.full_name,
            conversation.id,
            if conversation.unread_count > 0 {
                format!(" [{}]", conversation.unread_count)
            } else {
                String::new()
            },
            if conversation.typing { " typing..." } else { "" }
        );
    }
}

fn print_view(session: &ChatSession, last: usize) {
    let Some(view) = session.view() else {
        return;
    };
    let messages = view.messages();
    for message in &messages[messages.len().saturating_sub(last)..] {
        println!(
            "{} {}: {} {}",
            message.time_label(),
            message.user.full_name,
            message.content,
            message.status_indicator()
        );
    }
    if session.state().is_typing(view.room()) {
        println!("-- typing...");
    }
}
