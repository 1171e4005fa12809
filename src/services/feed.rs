use crate::domain::errors::SyncResult;
use crate::models::{NotificationCounts, NotificationId, NotificationRecord};
use crate::services::notification_sync::NotificationSync;
use std::collections::HashSet;

/// Accumulated view behind the full notifications page.
///
/// Page 1 comes from the shared cache; later pages are fetched on demand and
/// kept here only, never in the shared state.
pub struct NotificationFeed {
    sync: NotificationSync,
    records: Vec<NotificationRecord>,
    seen: HashSet<NotificationId>,
    next_page: u32,
    total_pages: u32,
}

impl NotificationFeed {
    pub fn new(sync: NotificationSync) -> Self {
        Self {
            sync,
            records: Vec::new(),
            seen: HashSet::new(),
            next_page: 1,
            total_pages: 1,
        }
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn unread_in_view(&self) -> usize {
        self.records.iter().filter(|record| !record.read).count()
    }

    pub fn has_more(&self) -> bool {
        self.next_page <= self.total_pages
    }

    /// Restart the view from page 1
    pub async fn refresh(&mut self, force: bool) -> &[NotificationRecord] {
        let first = self.sync.get_page(1, force).await;

        self.records.clear();
        self.seen.clear();
        self.append(&first.records);
        self.total_pages = first.total_pages;
        self.next_page = 2;

        &self.records
    }

    /// Append the next page. Returns how many records were added.
    ///
    /// Records already in view are skipped: new arrivals shift later pages.
    pub async fn load_more(&mut self) -> usize {
        if self.next_page == 1 {
            let before = self.records.len();
            self.refresh(false).await;
            return self.records.len() - before;
        }
        if !self.has_more() {
            return 0;
        }

        let page = self.sync.get_page(self.next_page, false).await;
        if page.fetched_at.is_none() {
            // failed or no session; leave the cursor so the next attempt retries
            return 0;
        }

        let added = self.append(&page.records);
        self.total_pages = page.total_pages;
        self.next_page += 1;
        added
    }

    pub async fn mark_read(&mut self, id: NotificationId) -> SyncResult<NotificationCounts> {
        let counts = self.sync.mark_read(id).await?;
        for record in self.records.iter_mut().filter(|record| record.id == id) {
            record.read = true;
        }
        Ok(counts)
    }

    pub async fn mark_all_read(&mut self) -> SyncResult<NotificationCounts> {
        let counts = self.sync.mark_all_read().await?;
        for record in self.records.iter_mut() {
            record.read = true;
        }
        Ok(counts)
    }

    fn append(&mut self, records: &[NotificationRecord]) -> usize {
        let mut added = 0;
        for record in records {
            if self.seen.insert(record.id) {
                self.records.push(record.clone());
                added += 1;
            }
        }
        added
    }
}
