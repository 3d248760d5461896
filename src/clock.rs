//! Injectable delay abstraction.
//!
//! The engine's pacing (post-add propagation wait, per-slot cool-down,
//! the secondary panel's empty-result retry) runs through [`Delay`] so
//! tests can observe requested durations instead of sleeping for real.

use std::time::Duration;

use async_trait::async_trait;

/// Asynchronous sleep, injectable for tests.
#[async_trait]
pub trait Delay: Send + Sync {
    /// Suspend the current task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production delay backed by the tokio timer.
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
