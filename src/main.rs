//! Fieldesk notification watcher.
//!
//! Keeps the header badge counters for the current session in sync with the
//! notification backend and logs every change.
//!
//! Environment variables:
//! - `FIELDESK_API_URL`: backend base URL (required)
//! - `FIELDESK_SESSION_TOKEN` or `FIELDESK_SESSION_FILE`: session token source
//! - `FIELDESK_POLL_INTERVAL_SECS`, `FIELDESK_CACHE_TTL_SECS`: refresh cadence
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use fieldesk::config::Config;
use fieldesk::domain::ports::SessionProvider;
use fieldesk::infrastructure::http::HttpNotificationGateway;
use fieldesk::infrastructure::observability;
use fieldesk::infrastructure::session::{SessionStore, TokenFileSession};
use fieldesk::services::{NotificationSync, SyncDeps};
use std::sync::Arc;
use tokio_stream::StreamExt;

fn build_session(config: &Config) -> Arc<dyn SessionProvider> {
    match (&config.session_file, &config.session_token) {
        (Some(path), _) => Arc::new(TokenFileSession::new(path.clone())),
        (None, Some(token)) => Arc::new(SessionStore::with_token(token)),
        (None, None) => Arc::new(SessionStore::new()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing and metrics
    let _observability = observability::init(&config)?;
    tracing::info!(api_url = %config.api_url, "Configuration loaded");

    let session = build_session(&config);
    if !session.is_authenticated() {
        tracing::warn!("No session token available; notification calls are disabled");
    }

    let gateway = HttpNotificationGateway::new(
        config.endpoints(),
        Arc::clone(&session),
        config.request_timeout(),
    )?;
    let sync = NotificationSync::create(
        SyncDeps::tokio(Arc::new(gateway), session),
        config.sync_config(),
    );

    let first_page = sync.get_page(1, false).await;
    tracing::info!(
        records = first_page.records.len(),
        unread = sync.unread_count(),
        total = sync.total_count(),
        "Initial notifications loaded"
    );

    // The badge is mounted for the lifetime of the process
    let badge = sync.attach_consumer();
    let mut counts = sync.counts_stream();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
            next = counts.next() => match next {
                Some(counts) => tracing::info!(
                    unread = counts.unread,
                    total = counts.total,
                    stale = counts.stale,
                    "Badge updated"
                ),
                None => break,
            },
        }
    }

    drop(badge);
    sync.dispose().await;

    tracing::info!("Fieldesk shutdown complete");
    Ok(())
}
