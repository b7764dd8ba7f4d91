//! Retry policies consulted by [`crate::retry::exec_async_operation`].

// self
use crate::retry::backoff::BackoffTimer;

/// Outcome notification passed to [`RetryPolicy::notify`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
	/// The operation succeeded.
	Success,
	/// The operation failed and no further retries will be attempted.
	Fail,
}

/// Decides whether, and after how long, a failed operation should be
/// retried.
///
/// `E` is the error type produced by the wrapped operation; policies may
/// inspect it (e.g. to avoid retrying on a non-retryable error variant).
pub trait RetryPolicy<E>: Send + Sync {
	/// Maximum number of retries this policy will ever grant.
	fn limit(&self) -> u32;

	/// Whether attempt number `attempt` (1-based, counting retries only)
	/// should be allowed to run given the error from the previous attempt.
	fn should_retry(&self, attempt: u32, err: &E) -> bool;

	/// Delay, in milliseconds, before `attempt` runs. A negative value means
	/// "do not retry" and causes the last error to be rethrown immediately.
	fn delay(&self, attempt: u32, err: &E) -> i64;

	/// Called once the operation has finished, successfully or not.
	///
	/// No bundled policy currently acts on this; it exists so future
	/// adaptive policies (e.g. circuit breakers) can observe outcomes
	/// without changing the trait.
	fn notify(&self, _outcome: Outcome) {}
}

/// Never retries: `limit() == 0`, `delay` is always `-1`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetryPolicy;
impl<E> RetryPolicy<E> for NoRetryPolicy {
	fn limit(&self) -> u32 {
		0
	}

	fn should_retry(&self, _attempt: u32, _err: &E) -> bool {
		false
	}

	fn delay(&self, _attempt: u32, _err: &E) -> i64 {
		-1
	}
}

/// Retries up to `limit` times, delaying each retry per a [`BackoffTimer`].
pub struct BasicRetryPolicy<B> {
	limit: u32,
	timer: B,
}
impl<B: BackoffTimer> BasicRetryPolicy<B> {
	/// Build a policy that retries up to `limit` times using `timer` for
	/// per-attempt delays.
	pub fn new(limit: u32, timer: B) -> Self {
		Self { limit, timer }
	}
}
impl<B: BackoffTimer, E> RetryPolicy<E> for BasicRetryPolicy<B> {
	fn limit(&self) -> u32 {
		self.limit
	}

	fn should_retry(&self, attempt: u32, _err: &E) -> bool {
		attempt <= self.limit
	}

	fn delay(&self, attempt: u32, err: &E) -> i64 {
		if self.should_retry(attempt, err) {
			self.timer.delay_ms(attempt) as i64
		} else {
			-1
		}
	}
}
