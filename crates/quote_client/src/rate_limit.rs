//! Rate limiter for the quote API.
//!
//! Yahoo's public chart endpoint throttles aggressively; a sweep over many
//! symbols fans out concurrently, so every request waits for a slot here.

use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter = GovLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Single-bucket request limiter shared across clones.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limiter: Arc<DirectLimiter>,
}

impl RateLimiter {
    /// Create with a per-second budget. Zero is treated as one.
    pub fn per_second(requests_per_sec: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_sec).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: Arc::new(GovLimiter::direct(quota)),
        }
    }

    /// Wait until a request slot is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a slot without waiting. Returns true if acquired.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_second(5)
    }
}
