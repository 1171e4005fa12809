//! Read-state reconciliation.
//!
//! Mark-read is pessimistic: the mutation goes to the server first and the
//! cached records are flipped only once it confirms. Counters are then taken
//! verbatim from the response, never adjusted locally.

use crate::domain::errors::SyncResult;
use crate::domain::ports::NotificationGateway;
use crate::models::{NotificationCounts, NotificationId};
use crate::services::page_cache::PageCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMutation {
    One(NotificationId),
    All,
}

impl ReadMutation {
    pub fn label(&self) -> &'static str {
        match self {
            ReadMutation::One(_) => "mark_read",
            ReadMutation::All => "mark_all_read",
        }
    }

    /// Issue the mutation against the remote service
    pub async fn send(&self, gateway: &dyn NotificationGateway) -> SyncResult<NotificationCounts> {
        match self {
            ReadMutation::One(id) => gateway.mark_read(*id).await,
            ReadMutation::All => gateway.mark_all_read().await,
        }
    }

    /// Apply a confirmed mutation to the cached page.
    ///
    /// Returns how many cached records were flipped.
    pub fn apply(&self, cache: &mut PageCache) -> usize {
        match self {
            ReadMutation::One(id) => usize::from(cache.mark_read(*id)),
            ReadMutation::All => cache.mark_all_read(),
        }
    }
}

/// Counters as published after a confirmed mutation
pub fn authoritative(counts: NotificationCounts) -> NotificationCounts {
    NotificationCounts {
        stale: false,
        ..counts
    }
}
