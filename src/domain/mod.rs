pub mod errors;
pub mod ports;

pub use errors::{SyncError, SyncResult};
