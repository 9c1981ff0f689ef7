use super::error::{ErrorKind, ProviderError};
use std::time::Duration;

const MAX_BACKOFF_MS: u64 = 10_000;
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);
const MIN_BASE_BACKOFF_MS: u64 = 50;

/// Centralized retry policy shared by every provider walk.
///
/// Adapters never sleep or retry on their own; classification happens in
/// `ProviderError` and pacing happens here, so changing retry behavior is a
/// one-place edit.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff_ms: 250,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            base_backoff_ms: base_backoff_ms.max(MIN_BASE_BACKOFF_MS),
        }
    }

    /// Whether `err` warrants another attempt against the same provider.
    ///
    /// `attempt` is zero-based: the first retry decision sees `attempt == 0`.
    /// Unknown errors get exactly one retry; rate limits and outages retry up
    /// to `max_retries`; auth and input errors never retry.
    pub fn should_retry(&self, attempt: u32, err: &ProviderError) -> bool {
        match err.kind() {
            ErrorKind::RateLimited | ErrorKind::ServiceUnavailable => attempt < self.max_retries,
            ErrorKind::Unknown => attempt == 0 && self.max_retries > 0,
            ErrorKind::Unauthorized | ErrorKind::InvalidInput => false,
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    ///
    /// Exponential doubling from the base, capped at 10s. A server-provided
    /// Retry-After wins over the computed delay but is capped at 30s and
    /// floored at the base so a `Retry-After: 0` cannot produce a hot loop.
    pub fn backoff(&self, attempt: u32, err: &ProviderError) -> Duration {
        let base = Duration::from_millis(self.base_backoff_ms.max(MIN_BASE_BACKOFF_MS));
        if let Some(hint) = err.retry_after() {
            return hint.clamp(base, MAX_RETRY_AFTER);
        }
        let exp = self
            .base_backoff_ms
            .max(MIN_BASE_BACKOFF_MS)
            .saturating_mul(1u64 << attempt.min(16))
            .min(MAX_BACKOFF_MS);
        Duration::from_millis(exp)
    }
}
