//! Rate limiting middleware
//!
//! Per-sender limits on inbound bot commands, so short recovery tokens cannot
//! be brute forced through the chat surfaces.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::{debug, warn};
use crate::models::ChatIdentity;
use crate::utils::errors::{GatherBuddyError, Result};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Time window duration
    pub window_duration: Duration,
    /// Burst allowance (extra requests allowed in short bursts)
    pub burst_allowance: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_duration: Duration::from_secs(60),
            burst_allowance: 5,
        }
    }
}

impl RateLimitConfig {
    /// One cell every `window / max_requests`, bursting up to
    /// `max_requests + burst_allowance`
    fn quota(&self) -> Quota {
        let max = NonZeroU32::new(self.max_requests.max(1)).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(max.get().saturating_add(self.burst_allowance)).unwrap_or(max);
        let period = self.window_duration / max.get();
        Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(max))
            .allow_burst(burst)
    }
}

/// Rate limiting middleware keyed by `platform:user_id`
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
}

impl RateLimitMiddleware {
    /// Create a new RateLimitMiddleware instance
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::keyed(config.quota())),
        }
    }

    fn key(sender: &ChatIdentity) -> String {
        format!("{}:{}", sender.platform, sender.user_id)
    }

    /// Check if the sender is rate limited
    pub fn check_rate_limit(&self, sender: &ChatIdentity) -> Result<()> {
        let key = Self::key(sender);
        match self.limiter.check_key(&key) {
            Ok(()) => {
                debug!(sender = %key, "Rate limit check passed");
                Ok(())
            }
            Err(_) => {
                warn!(
                    sender = %key,
                    handle = sender.handle.as_deref().unwrap_or("none"),
                    "Rate limit exceeded"
                );
                Err(GatherBuddyError::RateLimitExceeded)
            }
        }
    }

    /// Forget senders whose buckets are full again
    pub fn cleanup_old_entries(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        debug!(remaining_entries = self.limiter.len(), "Cleaned up old rate limit entries");
    }

    /// Number of tracked senders
    pub fn tracked_senders(&self) -> usize {
        self.limiter.len()
    }
}

impl Default for RateLimitMiddleware {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
