//! Backoff timers producing a delay in milliseconds for a given attempt.

// crates.io
use rand::Rng;
// self
use crate::_prelude::*;

/// Produces a delay, in milliseconds, before a given attempt number.
///
/// Attempt numbers are 1-based: `delay_ms(1)` is the wait before the first
/// retry (i.e. after the first failure).
pub trait BackoffTimer: Send + Sync {
	/// Compute the delay before `attempt`.
	fn delay_ms(&self, attempt: u32) -> u64;
}

/// How randomness is mixed into an otherwise-exponential backoff curve.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum JitterStrategy {
	/// No randomness; always the exact exponential value.
	None,
	/// Uniform draw between zero and the exponential value, capped.
	///
	/// This is the default and matches `JitterExponentialBackoffTimer`'s
	/// documented formula: `clamp(uniform(0, min(cap, base*2^(n-1))), 0, cap)`.
	#[default]
	Full,
	/// Uniform draw between `base` and `min(cap, previous*3)`, where
	/// `previous` is the uncapped exponential value for `attempt - 1`.
	Decorrelated,
}

/// Exponential backoff with a configurable jitter strategy.
///
/// `delay_ms(n)` for [`JitterStrategy::Full`] (the default) is
/// `clamp(uniform(0, min(cap, base*2^(n-1))), 0, cap)`; `n` is clamped to
/// avoid `2^(n-1)` overflowing before the `min(cap, ..)` clamp is applied.
#[derive(Clone, Debug)]
pub struct JitterExponentialBackoffTimer {
	base_ms: u64,
	cap_ms: u64,
	strategy: JitterStrategy,
}
impl JitterExponentialBackoffTimer {
	/// Build a timer with the default (`Full`) jitter strategy.
	pub fn new(base_ms: u64, cap_ms: u64) -> Self {
		Self { base_ms, cap_ms, strategy: JitterStrategy::Full }
	}

	/// Build a timer using an explicit jitter strategy.
	pub fn with_strategy(base_ms: u64, cap_ms: u64, strategy: JitterStrategy) -> Self {
		Self { base_ms, cap_ms, strategy }
	}

	fn exponential_ms(&self, attempt: u32) -> u64 {
		let exponent = attempt.saturating_sub(1).min(32);
		let scale = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
		let raw = self.base_ms.saturating_mul(scale);

		raw.min(self.cap_ms)
	}
}
impl BackoffTimer for JitterExponentialBackoffTimer {
	fn delay_ms(&self, attempt: u32) -> u64 {
		let bound = self.exponential_ms(attempt);

		match self.strategy {
			JitterStrategy::None => bound,
			JitterStrategy::Full =>
				if bound == 0 {
					0
				} else {
					rand::rng().random_range(0..=bound)
				},
			JitterStrategy::Decorrelated => {
				let previous = self.exponential_ms(attempt.saturating_sub(1));
				let upper = self.cap_ms.min(previous.saturating_mul(3)).max(self.base_ms);

				if upper <= self.base_ms {
					self.base_ms
				} else {
					rand::rng().random_range(self.base_ms..=upper)
				}
			},
		}
		.min(self.cap_ms)
	}
}
