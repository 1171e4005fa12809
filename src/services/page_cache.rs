use crate::models::{NotificationId, NotificationList, NotificationPage};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Single-entry TTL cache for page 1 of the notification list.
///
/// Entries are shared as `Arc` snapshots. Local read flips go through
/// `Arc::make_mut`, so a consumer holding an older snapshot keeps seeing what
/// it was handed.
#[derive(Debug)]
pub struct PageCache {
    ttl: Duration,
    entry: Option<Arc<NotificationPage>>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached page if it is younger than the TTL at `now`
    pub fn fresh(&self, now: Instant) -> Option<Arc<NotificationPage>> {
        let entry = self.entry.as_ref()?;
        let fetched_at = entry.fetched_at?;

        if now.saturating_duration_since(fetched_at) < self.ttl {
            Some(Arc::clone(entry))
        } else {
            None
        }
    }

    /// The cached page regardless of age
    pub fn current(&self) -> Option<Arc<NotificationPage>> {
        self.entry.clone()
    }

    /// Replace the entry with a freshly fetched list.
    ///
    /// `fetched_at` never moves backwards for the cached key.
    pub fn store(&mut self, list: NotificationList, fetched_at: Instant) -> Arc<NotificationPage> {
        let fetched_at = match self.entry.as_ref().and_then(|entry| entry.fetched_at) {
            Some(previous) if previous > fetched_at => previous,
            _ => fetched_at,
        };

        let page = Arc::new(NotificationPage::from_list(list, fetched_at));
        self.entry = Some(Arc::clone(&page));
        page
    }

    /// Flip one cached record to read. Returns true if a record changed.
    pub fn mark_read(&mut self, id: NotificationId) -> bool {
        let Some(entry) = self.entry.as_mut() else {
            return false;
        };

        if !entry.records.iter().any(|record| record.id == id && !record.read) {
            return false;
        }

        let page = Arc::make_mut(entry);
        for record in page.records.iter_mut().filter(|record| record.id == id) {
            record.read = true;
        }
        true
    }

    /// Flip every cached record to read. Returns how many changed.
    pub fn mark_all_read(&mut self) -> usize {
        let Some(entry) = self.entry.as_mut() else {
            return 0;
        };

        let unread = entry.records.iter().filter(|record| !record.read).count();
        if unread == 0 {
            return 0;
        }

        let page = Arc::make_mut(entry);
        for record in page.records.iter_mut() {
            record.read = true;
        }
        unread
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
