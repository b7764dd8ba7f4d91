//! Default durations, limits, and the default bundled retry policy.

// self
use crate::{
	clock::Millis,
	retry::{BasicRetryPolicy, JitterExponentialBackoffTimer, RetryPolicy},
};

/// Default TTL applied to a cache write with no explicit TTL: 180 seconds.
pub const DEFAULT_TTL_DURATION_MS: Millis = 180_000;
/// Default fresh-window duration: 30 seconds.
pub const DEFAULT_FRESH_DURATION_MS: Millis = 30_000;
/// Default retry limit for the bundled [`BasicRetryPolicy`].
pub const DEFAULT_RETRY_LIMIT: u32 = 3;
/// Default backoff base for [`JitterExponentialBackoffTimer`]: 1 second.
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
/// Default backoff cap for [`JitterExponentialBackoffTimer`]: 30 seconds.
pub const DEFAULT_BACKOFF_CAP_MS: u64 = 30_000;

/// The default retry policy: up to [`DEFAULT_RETRY_LIMIT`] retries, delayed
/// by a full-jitter exponential backoff bounded by
/// [`DEFAULT_BACKOFF_BASE_MS`]/[`DEFAULT_BACKOFF_CAP_MS`].
pub fn default_retry_policy<E>() -> std::sync::Arc<dyn RetryPolicy<E>>
where
	E: Send + Sync + 'static,
{
	std::sync::Arc::new(BasicRetryPolicy::new(
		DEFAULT_RETRY_LIMIT,
		JitterExponentialBackoffTimer::new(DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_CAP_MS),
	))
}
