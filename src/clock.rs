//! Monotonic clock, delayed-resume primitive, and cooperative cancellation token.
//!
//! These are the only timer/cancellation primitives the engine depends on;
//! everything above this layer (backoff, retry, query/mutation engines) is
//! built purely in terms of [`now_ms`], [`sleep_ms`], and [`CancelToken`].

// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::_prelude::*;

/// Monotonic millisecond timestamp, measured from an unspecified epoch that is
/// stable for the lifetime of the process.
///
/// `CacheEntry`/`CachePayload`-style bookkeeping throughout the crate is done
/// in these rather than `Instant` directly so that durations can be stored,
/// compared, and serialised (for snapshots/patches) without pulling in a
/// wall-clock dependency the core does not otherwise need.
pub type Millis = u64;

static CLOCK_EPOCH: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Current monotonic time in milliseconds since the engine was first used.
pub fn now_ms() -> Millis {
	let epoch = CLOCK_EPOCH.get_or_init(Instant::now);

	epoch.elapsed().as_millis() as Millis
}

/// Suspend the current task for the given number of milliseconds.
///
/// A zero duration still yields once to the scheduler, matching
/// `execAsyncOperation`'s "else sleep `d` ms" step when `d == 0`.
pub async fn sleep_ms(ms: Millis) {
	tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Cloneable cancellation signal forwarded to user `queryFn`/`mutationFn`
/// callbacks.
///
/// The engine never inspects cancellation beyond forwarding this token: a
/// cancelled user function is expected to observe [`CancelToken::is_cancelled`]
/// or `cancelled().await` and return an error of its own choosing, which then
/// flows through the retry policy like any other failure.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
	inner: CancellationToken,
}
impl CancelToken {
	/// Create a new, not-yet-cancelled token.
	pub fn new() -> Self {
		Self { inner: CancellationToken::new() }
	}

	/// Derive a child token that is cancelled whenever `self` is cancelled,
	/// but can also be cancelled independently without affecting `self`.
	pub fn child(&self) -> Self {
		Self { inner: self.inner.child_token() }
	}

	/// Signal cancellation to every clone of this token.
	pub fn cancel(&self) {
		self.inner.cancel();
	}

	/// Whether cancellation has been signalled.
	pub fn is_cancelled(&self) -> bool {
		self.inner.is_cancelled()
	}

	/// Resolve once cancellation is signalled.
	pub async fn cancelled(&self) {
		self.inner.cancelled().await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn now_ms_is_monotonic() {
		let first = now_ms();

		sleep_ms(5).await;

		let second = now_ms();

		assert!(second >= first);
	}

	#[tokio::test]
	async fn cancel_token_propagates_to_children() {
		let parent = CancelToken::new();
		let child = parent.child();

		assert!(!child.is_cancelled());

		parent.cancel();

		assert!(child.is_cancelled());
	}
}
