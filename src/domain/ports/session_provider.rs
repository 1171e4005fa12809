/// Read-only view of the externally owned session.
///
/// The console shell logs users in and out; the sync layer only asks whether
/// a token is present before touching the network.
pub trait SessionProvider: Send + Sync {
    /// Current session token, if any
    fn token(&self) -> Option<String>;

    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}
