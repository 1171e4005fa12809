use crate::domain::errors::SyncResult;
use crate::models::{NotificationCounts, NotificationId, NotificationList};

/// Remote notification service as seen by the sync layer
#[async_trait::async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Lightweight unread/total count for the session's user
    async fn fetch_count(&self) -> SyncResult<NotificationCounts>;

    /// One page of notifications along with the server's current counts
    async fn fetch_list(&self, page: u32, page_size: u32) -> SyncResult<NotificationList>;

    /// Mark a single notification as read, returning authoritative counts
    async fn mark_read(&self, id: NotificationId) -> SyncResult<NotificationCounts>;

    /// Mark every notification as read, returning authoritative counts
    async fn mark_all_read(&self) -> SyncResult<NotificationCounts>;
}
