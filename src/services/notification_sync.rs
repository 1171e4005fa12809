use crate::domain::errors::{SyncError, SyncResult};
use crate::domain::ports::{NotificationGateway, SessionProvider, TaskSpawner, TimeService};
use crate::infrastructure::runtime::{TokioTaskSpawner, TokioTimeService};
use crate::models::{NotificationCounts, NotificationId, NotificationPage};
use crate::services::coalescer::RequestCoalescer;
use crate::services::page_cache::PageCache;
use crate::services::poller::{
    ConsumerGuard, PollingCoordinator, PollingHandle, TickFn, TickOutcome,
};
use crate::services::reconciler::{self, ReadMutation};
use futures::FutureExt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

/// What a failed fetch does to the published counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Drop counters to zero and forget the cached page
    #[default]
    ResetToZero,
    /// Keep the last known counters and page, flagged as stale
    KeepLastKnown,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::ResetToZero => "reset",
            FailurePolicy::KeepLastKnown => "keep",
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reset" | "reset_to_zero" => Ok(FailurePolicy::ResetToZero),
            "keep" | "keep_last_known" => Ok(FailurePolicy::KeepLastKnown),
            other => Err(format!("unknown failure policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub page_size: u32,
    pub cache_ttl: Duration,
    pub poll_interval: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            cache_ttl: Duration::from_secs(10 * 60),
            poll_interval: Duration::from_secs(10 * 60),
            failure_policy: FailurePolicy::ResetToZero,
        }
    }
}

/// Collaborators injected into a sync handle
#[derive(Clone)]
pub struct SyncDeps {
    pub gateway: Arc<dyn NotificationGateway>,
    pub session: Arc<dyn SessionProvider>,
    pub spawner: Arc<dyn TaskSpawner>,
    pub time: Arc<dyn TimeService>,
}

impl SyncDeps {
    /// Dependencies running on the ambient tokio runtime
    pub fn tokio(
        gateway: Arc<dyn NotificationGateway>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            gateway,
            session,
            spawner: Arc::new(TokioTaskSpawner::new()),
            time: Arc::new(TokioTimeService::new()),
        }
    }
}

struct SyncState {
    cache: PageCache,
    /// Bumped on every reset; fetches started under an older epoch are not applied
    epoch: u64,
    populated: bool,
}

struct SyncInner {
    gateway: Arc<dyn NotificationGateway>,
    session: Arc<dyn SessionProvider>,
    time: Arc<dyn TimeService>,
    config: SyncConfig,
    state: Mutex<SyncState>,
    counts: watch::Sender<NotificationCounts>,
    /// Keyed by `(epoch, page)`: a fetch registered for an ended session is never joined
    pages: RequestCoalescer<(u64, u32), Arc<NotificationPage>>,
    count_fetches: RequestCoalescer<u64, NotificationCounts>,
    poller: PollingCoordinator,
}

fn record_fetch(endpoint: &'static str, outcome: &'static str) {
    metrics::counter!("fieldesk_fetch_total", "endpoint" => endpoint, "outcome" => outcome)
        .increment(1);
}

impl SyncInner {
    fn publish(&self, counts: NotificationCounts) {
        self.counts.send_replace(reconciler::authoritative(counts));
    }

    fn clear_locked(&self, state: &mut SyncState) {
        state.epoch += 1;
        state.cache.clear();
        state.populated = false;
        self.counts.send_replace(NotificationCounts::default());
    }

    async fn fetch_page(&self, page: u32, epoch: u64) -> Arc<NotificationPage> {
        let started = self.time.now();

        let list = match self.gateway.fetch_list(page, self.config.page_size).await {
            Ok(list) => list,
            Err(err) => {
                // only page 1 lives in the cache
                self.handle_fetch_failure("list", &err, epoch, page == 1).await;
                return Arc::new(NotificationPage::empty(page));
            }
        };
        record_fetch("list", "ok");

        let fetched_at = self.time.now();
        let counts = list.counts;
        let mut state = self.state.lock().await;

        if state.epoch != epoch {
            debug!(page, "Discarding list response from an ended session");
            return Arc::new(NotificationPage::from_list(list, fetched_at));
        }

        let result = if page == 1 {
            state.cache.store(list, fetched_at)
        } else {
            Arc::new(NotificationPage::from_list(list, fetched_at))
        };
        state.populated = true;
        self.publish(counts);

        debug!(
            page,
            records = result.records.len(),
            unread = counts.unread,
            total = counts.total,
            elapsed_ms = fetched_at.duration_since(started).as_millis() as u64,
            "Notification page fetched"
        );
        result
    }

    async fn fetch_count(&self, epoch: u64) -> NotificationCounts {
        let counts = match self.gateway.fetch_count().await {
            Ok(counts) => counts,
            Err(err) => {
                self.handle_fetch_failure("count", &err, epoch, false).await;
                return *self.counts.borrow();
            }
        };
        record_fetch("count", "ok");

        let counts = reconciler::authoritative(counts);
        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            debug!("Discarding count response from an ended session");
            return counts;
        }

        state.populated = true;
        self.publish(counts);
        debug!(unread = counts.unread, total = counts.total, "Notification count fetched");
        counts
    }

    /// Apply the failure policy. `drops_cached_page` is set only for a failed page-1 list fetch.
    async fn handle_fetch_failure(
        &self,
        endpoint: &'static str,
        err: &SyncError,
        epoch: u64,
        drops_cached_page: bool,
    ) {
        record_fetch(endpoint, err.kind());
        warn!(endpoint, error = %err, "Notification fetch failed");

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            return;
        }

        if err.is_auth_failure() {
            info!("Session rejected by server, clearing notification state");
            self.clear_locked(&mut state);
            drop(state);
            self.poller.stop();
            return;
        }

        match self.config.failure_policy {
            FailurePolicy::ResetToZero => {
                if drops_cached_page {
                    state.cache.clear();
                }
                self.counts.send_replace(NotificationCounts::default());
            }
            FailurePolicy::KeepLastKnown => {
                self.counts.send_modify(|counts| counts.stale = true);
            }
        }
    }
}

/// Session-scoped notification state shared by every consumer surface.
///
/// Cloning is cheap and every clone observes the same counters, cache and
/// in-flight fetches. Build one per session with [`NotificationSync::create`]
/// and tear it down with [`NotificationSync::dispose`].
#[derive(Clone)]
pub struct NotificationSync {
    inner: Arc<SyncInner>,
}

impl NotificationSync {
    pub fn create(deps: SyncDeps, config: SyncConfig) -> Self {
        let (counts, _) = watch::channel(NotificationCounts::default());
        let poller = PollingCoordinator::new(
            config.poll_interval,
            Arc::clone(&deps.spawner),
            Arc::clone(&deps.time),
        );

        Self {
            inner: Arc::new(SyncInner {
                gateway: deps.gateway,
                session: deps.session,
                time: deps.time,
                state: Mutex::new(SyncState {
                    cache: PageCache::new(config.cache_ttl),
                    epoch: 0,
                    populated: false,
                }),
                counts,
                pages: RequestCoalescer::new("list", Arc::clone(&deps.spawner)),
                count_fetches: RequestCoalescer::new("count", deps.spawner),
                poller,
                config,
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn counts(&self) -> NotificationCounts {
        *self.inner.counts.borrow()
    }

    pub fn unread_count(&self) -> u64 {
        self.counts().unread
    }

    pub fn total_count(&self) -> u64 {
        self.counts().total
    }

    /// Receiver that observes every counter change
    pub fn subscribe(&self) -> watch::Receiver<NotificationCounts> {
        self.inner.counts.subscribe()
    }

    /// Counter changes as a stream, starting with the current value
    pub fn counts_stream(&self) -> WatchStream<NotificationCounts> {
        WatchStream::new(self.subscribe())
    }

    /// Cached page 1, whatever its age
    pub async fn cached_page(&self) -> Option<Arc<NotificationPage>> {
        self.inner.state.lock().await.cache.current()
    }

    /// Fetch a page of notifications.
    ///
    /// Page 1 is served from cache while younger than the TTL unless
    /// `force_refresh` is set. Concurrent requests for the same page share
    /// one network call and receive the same `Arc`. Failures resolve to an
    /// empty page.
    pub async fn get_page(&self, page: u32, force_refresh: bool) -> Arc<NotificationPage> {
        let page = page.max(1);

        if !self.session_active().await {
            debug!(page, "No session, returning empty notification page");
            return Arc::new(NotificationPage::empty(page));
        }

        let epoch = {
            let state = self.inner.state.lock().await;
            if page == 1 && !force_refresh {
                if let Some(cached) = state.cache.fresh(self.inner.time.now()) {
                    metrics::counter!("fieldesk_cache_hits_total").increment(1);
                    debug!("Serving notification page from cache");
                    return cached;
                }
            }
            state.epoch
        };

        let inner = Arc::clone(&self.inner);
        self.inner
            .pages
            .join_or_start((epoch, page), move || async move {
                inner.fetch_page(page, epoch).await
            })
            .await
            .await
    }

    /// Re-read counters from the count-only endpoint; the list cache is untouched
    pub async fn refresh_count(&self) -> NotificationCounts {
        if !self.session_active().await {
            debug!("No session, skipping count refresh");
            return NotificationCounts::default();
        }

        let epoch = self.inner.state.lock().await.epoch;
        let inner = Arc::clone(&self.inner);
        self.inner
            .count_fetches
            .join_or_start(epoch, move || async move { inner.fetch_count(epoch).await })
            .await
            .await
    }

    pub async fn mark_read(&self, id: NotificationId) -> SyncResult<NotificationCounts> {
        self.apply_mutation(ReadMutation::One(id)).await
    }

    pub async fn mark_all_read(&self) -> SyncResult<NotificationCounts> {
        self.apply_mutation(ReadMutation::All).await
    }

    async fn apply_mutation(&self, mutation: ReadMutation) -> SyncResult<NotificationCounts> {
        if !self.session_active().await {
            debug!(operation = mutation.label(), "No session, skipping read mutation");
            return Ok(NotificationCounts::default());
        }

        let epoch = self.inner.state.lock().await.epoch;
        let counts = match mutation.send(self.inner.gateway.as_ref()).await {
            Ok(counts) => reconciler::authoritative(counts),
            Err(err) => {
                record_fetch(mutation.label(), err.kind());
                warn!(operation = mutation.label(), error = %err, "Read mutation failed");
                return Err(err);
            }
        };
        record_fetch(mutation.label(), "ok");

        let mut state = self.inner.state.lock().await;
        if state.epoch != epoch {
            debug!(
                operation = mutation.label(),
                "Session ended before read mutation was confirmed"
            );
            return Ok(counts);
        }

        let flipped = mutation.apply(&mut state.cache);
        state.populated = true;
        self.inner.publish(counts);

        debug!(
            operation = mutation.label(),
            flipped,
            unread = counts.unread,
            total = counts.total,
            "Read mutation confirmed"
        );
        Ok(counts)
    }

    /// Arm the poll timer for this session. Returns `None` without a session.
    pub fn start_polling(&self) -> Option<PollingHandle> {
        if !self.inner.session.is_authenticated() {
            debug!("No session, not starting notification polling");
            return None;
        }
        Some(self.inner.poller.start(self.tick_fn()))
    }

    pub fn stop_polling(&self) -> bool {
        self.inner.poller.stop()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_polling()
    }

    /// Register a mounted surface; the first one with a session arms polling
    pub fn attach_consumer(&self) -> ConsumerGuard {
        let tick = self
            .inner
            .session
            .is_authenticated()
            .then(|| self.tick_fn());
        self.inner.poller.attach(tick)
    }

    /// Drop all session state: counters, cached page, in-flight table and timer
    pub async fn reset(&self) {
        self.inner.poller.stop();
        {
            let mut state = self.inner.state.lock().await;
            self.inner.clear_locked(&mut state);
        }
        self.inner.pages.clear().await;
        self.inner.count_fetches.clear().await;
        info!("Notification state reset");
    }

    pub async fn dispose(self) {
        self.reset().await;
        debug!("Notification sync disposed");
    }

    /// Session gate. A missing session also clears state left from the last one.
    async fn session_active(&self) -> bool {
        if self.inner.session.is_authenticated() {
            return true;
        }

        let populated = self.inner.state.lock().await.populated;
        if populated || self.inner.poller.is_polling() {
            info!("Session ended, clearing notification state");
            self.reset().await;
        }
        false
    }

    fn tick_fn(&self) -> TickFn {
        let weak: Weak<SyncInner> = Arc::downgrade(&self.inner);
        Arc::new(move || {
            let weak = weak.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return TickOutcome::Stop;
                };
                let sync = NotificationSync { inner };

                if !sync.session_active().await {
                    return TickOutcome::Stop;
                }

                sync.get_page(1, true).await;
                TickOutcome::Continue
            }
            .boxed()
        })
    }
}
