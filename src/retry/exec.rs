//! `execAsyncOperation`: the generic retry-and-backoff driver every engine
//! algorithm (`runQuery`, `executeMutation`) is built on top of.

// std
use std::future::Future;
// self
use crate::{clock::sleep_ms, retry::policy::{Outcome, RetryPolicy}};

/// Run `op` repeatedly until it succeeds or `policy` gives up.
///
/// `on_retry`, when provided, is called once per retry — after the computed
/// delay has elapsed, immediately before the next attempt — with the attempt
/// number that is about to run and the error that caused the retry. Per the
/// handler-error policy elsewhere in the crate, a panicking `on_retry` is not
/// caught here; callers are expected to keep it infallible.
pub async fn exec_async_operation<T, E, Op, Fut>(
	mut op: Op,
	policy: &dyn RetryPolicy<E>,
	mut on_retry: Option<&mut dyn FnMut(u32, &E)>,
) -> Result<T, E>
where
	Op: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	let mut attempt: u32 = 0;

	loop {
		match op().await {
			Ok(value) => {
				policy.notify(Outcome::Success);

				return Ok(value);
			},
			Err(err) => {
				attempt += 1;

				let delay = policy.delay(attempt, &err);

				if delay < 0 {
					policy.notify(Outcome::Fail);

					tracing::debug!(attempt, "giving up after exhausting the retry policy");

					return Err(err);
				}

				if delay > 0 {
					sleep_ms(delay as u64).await;
				}

				tracing::debug!(attempt, delay_ms = delay.max(0), "retrying after backoff");

				if let Some(on_retry) = on_retry.as_deref_mut() {
					on_retry(attempt, &err);
				}
			},
		}
	}
}
