pub mod coalescer;
pub mod feed;
pub mod notification_sync;
pub mod page_cache;
pub mod poller;
pub mod reconciler;

pub use feed::NotificationFeed;
pub use notification_sync::{FailurePolicy, NotificationSync, SyncConfig, SyncDeps};
pub use poller::{ConsumerGuard, PollingCoordinator, PollingHandle};
