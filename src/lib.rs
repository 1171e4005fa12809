//! Notification synchronization for the field-service console.
//!
//! One [`NotificationSync`] per session feeds the header badge, the dropdown
//! panel and the notifications page from a single TTL-cached, coalesced view
//! of the remote notification service.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod models;
pub mod services;

pub use config::*;
pub use domain::{SyncError, SyncResult};
pub use models::*;
pub use services::*;
