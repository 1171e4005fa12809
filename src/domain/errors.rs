use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Unexpected HTTP status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Session rejected by notification service")]
    Unauthenticated,
}

impl SyncError {
    /// True when the server no longer accepts the session token.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, SyncError::Unauthenticated)
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Transport(_) => "transport",
            SyncError::MalformedResponse(_) => "malformed",
            SyncError::Http { .. } => "http",
            SyncError::Unauthenticated => "unauthenticated",
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
