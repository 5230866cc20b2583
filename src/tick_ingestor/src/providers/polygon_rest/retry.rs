use std::time::Duration;

/// Retry and deadline rules for one paginated fetch.
///
/// The defaults retry rate limits with uncapped exponential backoff and
/// timeouts with a fixed delay, both until the overall deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wall-clock budget for the whole paginated sequence, checked before every request.
    pub deadline: Duration,
    /// Pause before re-issuing a request that timed out.
    pub timeout_retry_delay: Duration,
    /// Upper bound on a single rate-limit wait.
    pub max_backoff: Option<Duration>,
    /// Maximum consecutive 429 retries for one page before giving up on the fetch.
    pub max_rate_limit_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(300),
            timeout_retry_delay: Duration::from_secs(5),
            max_backoff: None,
            max_rate_limit_retries: None,
        }
    }
}

impl RetryPolicy {
    /// `2^retry_count` seconds, clamped to `max_backoff`.
    pub fn rate_limit_wait(&self, retry_count: u32) -> Duration {
        let secs = 2u64.checked_pow(retry_count).unwrap_or(u64::MAX);
        let wait = Duration::from_secs(secs);
        match self.max_backoff {
            Some(cap) => wait.min(cap),
            None => wait,
        }
    }

    pub fn allows_rate_limit_retry(&self, retry_count: u32) -> bool {
        self.max_rate_limit_retries
            .is_none_or(|max| retry_count < max)
    }
}
