#![allow(dead_code)]
pub mod mock_gateway;

pub use mock_gateway::*;

use fieldesk::infrastructure::runtime::{TokioTaskSpawner, TokioTimeService};
use fieldesk::infrastructure::session::SessionStore;
use fieldesk::{NotificationSync, SyncConfig, SyncDeps};
use std::sync::Arc;

pub const SESSION_TOKEN: &str = "sessao-tecnico-01";

pub struct Fixture {
    pub sync: NotificationSync,
    pub gateway: Arc<MockNotificationGateway>,
    pub session: SessionStore,
}

/// Sync handle over a mock backend with a logged-in session
pub fn fixture() -> Fixture {
    fixture_with(SyncConfig::default(), true)
}

pub fn fixture_with(config: SyncConfig, logged_in: bool) -> Fixture {
    let gateway = Arc::new(MockNotificationGateway::new());
    let session = if logged_in {
        SessionStore::with_token(SESSION_TOKEN)
    } else {
        SessionStore::new()
    };

    let sync = NotificationSync::create(
        SyncDeps {
            gateway: gateway.clone(),
            session: Arc::new(session.clone()),
            spawner: Arc::new(TokioTaskSpawner::new()),
            time: Arc::new(TokioTimeService::new()),
        },
        config,
    );

    Fixture {
        sync,
        gateway,
        session,
    }
}
