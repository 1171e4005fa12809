use crate::domain::ports::SessionProvider;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

fn normalize(token: &str) -> Option<String> {
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// In-memory session slot owned by the console shell.
///
/// Clones share the same slot, so the shell can log out while the sync layer
/// holds its own handle.
#[derive(Clone, Default)]
pub struct SessionStore {
    token: Arc<RwLock<Option<String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        store.login(token);
        store
    }

    pub fn login(&self, token: &str) {
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *slot = normalize(token);
    }

    pub fn logout(&self) {
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }
}

impl SessionProvider for SessionStore {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Session token persisted by the login flow in a file.
///
/// Read on every check, so logging out elsewhere (deleting or emptying the
/// file) is picked up by the next gated call.
#[derive(Debug, Clone)]
pub struct TokenFileSession {
    path: PathBuf,
}

impl TokenFileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionProvider for TokenFileSession {
    fn token(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => normalize(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No session token file");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read session token");
                None
            }
        }
    }
}
