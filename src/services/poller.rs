//! Polling coordinator.
//!
//! Two states: idle (no timer) and polling (one timer task armed). Starting
//! while polling hands back the live handle instead of arming a second timer.
//! Mounted surfaces register through `ConsumerGuard`; dropping the last guard
//! returns the coordinator to idle.

use crate::domain::ports::{TaskSpawner, TimeService};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What the poll loop should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop,
}

/// Callback run on every tick
pub type TickFn = Arc<dyn Fn() -> BoxFuture<'static, TickOutcome> + Send + Sync>;

/// Handle on one armed timer
#[derive(Debug, Clone)]
pub struct PollingHandle {
    id: u64,
    token: CancellationToken,
}

impl PollingHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

#[derive(Default)]
struct PollerSlot {
    active: Option<PollingHandle>,
    consumers: usize,
}

struct PollerShared {
    interval: Duration,
    spawner: Arc<dyn TaskSpawner>,
    time: Arc<dyn TimeService>,
    slot: Mutex<PollerSlot>,
    next_id: AtomicU64,
}

impl PollerShared {
    fn slot(&self) -> MutexGuard<'_, PollerSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_locked(self: &Arc<Self>, slot: &mut PollerSlot, tick: TickFn) -> PollingHandle {
        if let Some(handle) = slot.active.as_ref().filter(|handle| handle.is_active()) {
            debug!(poller = handle.id, "Polling already active");
            return handle.clone();
        }

        let handle = PollingHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            token: CancellationToken::new(),
        };
        slot.active = Some(handle.clone());

        info!(
            poller = handle.id,
            interval_secs = self.interval.as_secs(),
            "Starting notification polling"
        );

        let shared = Arc::clone(self);
        let loop_handle = handle.clone();
        self.spawner
            .spawn(async move { shared.run(loop_handle, tick).await }.boxed());

        handle
    }

    fn stop_locked(slot: &mut PollerSlot) -> bool {
        match slot.active.take() {
            Some(handle) => {
                handle.token.cancel();
                info!(poller = handle.id, "Stopped notification polling");
                true
            }
            None => false,
        }
    }

    async fn run(self: Arc<Self>, handle: PollingHandle, tick: TickFn) {
        loop {
            tokio::select! {
                biased;
                _ = handle.token.cancelled() => break,
                _ = self.time.sleep(self.interval) => {}
            }

            metrics::counter!("fieldesk_poll_ticks_total").increment(1);
            debug!(poller = handle.id, "Poll tick");

            if tick().await == TickOutcome::Stop {
                debug!(poller = handle.id, "Poll loop asked to stop");
                break;
            }
        }

        handle.token.cancel();
        let mut slot = self.slot();
        if slot.active.as_ref().map_or(false, |active| active.id == handle.id) {
            slot.active = None;
        }
    }
}

/// Owner of the single recurring refresh timer for a session
#[derive(Clone)]
pub struct PollingCoordinator {
    shared: Arc<PollerShared>,
}

impl PollingCoordinator {
    pub fn new(
        interval: Duration,
        spawner: Arc<dyn TaskSpawner>,
        time: Arc<dyn TimeService>,
    ) -> Self {
        Self {
            shared: Arc::new(PollerShared {
                interval,
                spawner,
                time,
                slot: Mutex::new(PollerSlot::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Arm the timer, or return the one already armed
    pub fn start(&self, tick: TickFn) -> PollingHandle {
        let mut slot = self.shared.slot();
        self.shared.start_locked(&mut slot, tick)
    }

    /// Cancel the timer. Returns false if it was idle.
    pub fn stop(&self) -> bool {
        let mut slot = self.shared.slot();
        PollerShared::stop_locked(&mut slot)
    }

    pub fn is_polling(&self) -> bool {
        self.shared
            .slot()
            .active
            .as_ref()
            .map_or(false, PollingHandle::is_active)
    }

    pub fn active_handle(&self) -> Option<PollingHandle> {
        self.shared.slot().active.clone()
    }

    pub fn consumer_count(&self) -> usize {
        self.shared.slot().consumers
    }

    /// Register a mounted surface, arming the timer when `tick` is given
    pub fn attach(&self, tick: Option<TickFn>) -> ConsumerGuard {
        let mut slot = self.shared.slot();
        slot.consumers += 1;
        if let Some(tick) = tick {
            self.shared.start_locked(&mut slot, tick);
        }

        ConsumerGuard {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// A mounted consumer surface; polling stops when the last one drops
pub struct ConsumerGuard {
    shared: Arc<PollerShared>,
}

impl Drop for ConsumerGuard {
    fn drop(&mut self) {
        let mut slot = self.shared.slot();
        slot.consumers = slot.consumers.saturating_sub(1);
        if slot.consumers == 0 {
            PollerShared::stop_locked(&mut slot);
        }
    }
}
