use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

#[async_trait]
pub trait TimeService: Send + Sync {
    /// Monotonic now, used to age cache entries
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}
