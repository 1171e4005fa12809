use async_trait::async_trait;
use fieldesk::domain::ports::NotificationGateway;
use fieldesk::{
    NotificationCounts, NotificationId, NotificationList, NotificationRecord, SyncError,
    SyncResult,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// How a mocked call should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    Transport,
    Malformed,
    Unauthenticated,
}

impl MockFailure {
    fn to_error(self) -> SyncError {
        match self {
            MockFailure::Transport => SyncError::Transport("connection refused".to_string()),
            MockFailure::Malformed => {
                SyncError::MalformedResponse("missing field `dados`".to_string())
            }
            MockFailure::Unauthenticated => SyncError::Unauthenticated,
        }
    }
}

#[derive(Default)]
struct MockState {
    pages: HashMap<u32, NotificationList>,
    counts: NotificationCounts,
    mark_response: NotificationCounts,
    list_failure: Option<MockFailure>,
    count_failure: Option<MockFailure>,
    mark_failure: Option<MockFailure>,
    delay: Duration,
    requested_pages: Vec<u32>,
    marked: Vec<Option<NotificationId>>,
}

/// Recording stand-in for the notification backend
#[derive(Default)]
pub struct MockNotificationGateway {
    state: Mutex<MockState>,
    list_calls: AtomicUsize,
    count_calls: AtomicUsize,
    mark_calls: AtomicUsize,
}

impl MockNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_page(&self, list: NotificationList) {
        self.with_state(|s| {
            s.pages.insert(list.page, list);
        });
    }

    pub fn set_counts(&self, counts: NotificationCounts) {
        self.with_state(|s| s.counts = counts);
    }

    pub fn set_mark_response(&self, counts: NotificationCounts) {
        self.with_state(|s| s.mark_response = counts);
    }

    pub fn fail_list(&self, failure: Option<MockFailure>) {
        self.with_state(|s| s.list_failure = failure);
    }

    pub fn fail_count(&self, failure: Option<MockFailure>) {
        self.with_state(|s| s.count_failure = failure);
    }

    pub fn fail_mark(&self, failure: Option<MockFailure>) {
        self.with_state(|s| s.mark_failure = failure);
    }

    /// Latency applied to every call (uses tokio time, so paused tests stay instant)
    pub fn set_delay(&self, delay: Duration) {
        self.with_state(|s| s.delay = delay);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn mark_calls(&self) -> usize {
        self.mark_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.list_calls() + self.count_calls() + self.mark_calls()
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.with_state(|s| s.requested_pages.clone())
    }

    pub fn marked(&self) -> Vec<Option<NotificationId>> {
        self.with_state(|s| s.marked.clone())
    }

    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl NotificationGateway for MockNotificationGateway {
    async fn fetch_count(&self) -> SyncResult<NotificationCounts> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, failure, counts) =
            self.with_state(|s| (s.delay, s.count_failure, s.counts));

        self.pause(delay).await;
        match failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(counts),
        }
    }

    async fn fetch_list(&self, page: u32, _page_size: u32) -> SyncResult<NotificationList> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, failure, list, counts) = self.with_state(|s| {
            s.requested_pages.push(page);
            (s.delay, s.list_failure, s.pages.get(&page).cloned(), s.counts)
        });

        self.pause(delay).await;
        if let Some(failure) = failure {
            return Err(failure.to_error());
        }

        Ok(list.unwrap_or(NotificationList {
            records: Vec::new(),
            page,
            total_pages: 0,
            counts,
        }))
    }

    async fn mark_read(&self, id: NotificationId) -> SyncResult<NotificationCounts> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, failure, counts) = self.with_state(|s| {
            s.marked.push(Some(id));
            (s.delay, s.mark_failure, s.mark_response)
        });

        self.pause(delay).await;
        match failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(counts),
        }
    }

    async fn mark_all_read(&self) -> SyncResult<NotificationCounts> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        let (delay, failure, counts) = self.with_state(|s| {
            s.marked.push(None);
            (s.delay, s.mark_failure, s.mark_response)
        });

        self.pause(delay).await;
        match failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(counts),
        }
    }
}

pub fn record(id: NotificationId, read: bool) -> NotificationRecord {
    NotificationRecord {
        id,
        title: format!("Notificação {}", id),
        message: format!("Ordem de serviço #{} atualizada", 1000 + id),
        link: Some(format!("/ordens/{}", 1000 + id)),
        created_at: "2026-05-02T13:45:00Z".to_string(),
        read,
    }
}

pub fn list(
    page: u32,
    total_pages: u32,
    records: Vec<NotificationRecord>,
    unread: u64,
    total: u64,
) -> NotificationList {
    NotificationList {
        records,
        page,
        total_pages,
        counts: NotificationCounts::new(unread, total),
    }
}
