//! `ClientOptions`/`ClientBuilder`: validated construction for a [`Client`](super::Client).
//!
//! A builder over a plain config struct with sane defaults, finalised by
//! `build()` into the orchestration type itself.

// std
use std::sync::Arc;
// self
use crate::{
	Error, Result,
	cache::{CacheManager, CacheStore, PersistentStore},
	clock::Millis,
	defaults,
	key::{HashFn, default_hash_fn},
	retry::RetryPolicy,
};

/// Configuration shared by every query/mutation a [`Client`](super::Client)
/// orchestrates.
pub struct ClientOptions<T, E> {
	/// Backing store for cached values. Defaults to an unbounded
	/// [`PersistentStore`].
	pub cache: Arc<dyn CacheStore<T>>,
	/// Maps a [`crate::key::Key`] to its [`crate::key::Hash`]. Defaults to
	/// [`default_hash_fn`].
	pub hash_fn: HashFn,
	/// TTL applied to writes that don't specify their own. Defaults to
	/// [`defaults::DEFAULT_TTL_DURATION_MS`].
	pub default_ttl_ms: Millis,
	/// Age below which a cached entry is treated as fresh rather than
	/// stale. Defaults to [`defaults::DEFAULT_FRESH_DURATION_MS`].
	pub fresh_ms: Millis,
	/// Retry policy applied to every `queryFn`/`mutationFn` invocation.
	/// Defaults to [`defaults::default_retry_policy`].
	pub retry_policy: Arc<dyn RetryPolicy<E>>,
}
impl<T, E> Clone for ClientOptions<T, E> {
	fn clone(&self) -> Self {
		Self {
			cache: self.cache.clone(),
			hash_fn: self.hash_fn.clone(),
			default_ttl_ms: self.default_ttl_ms,
			fresh_ms: self.fresh_ms,
			retry_policy: self.retry_policy.clone(),
		}
	}
}
impl<T, E> Default for ClientOptions<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	fn default() -> Self {
		Self {
			cache: Arc::new(PersistentStore::new()),
			hash_fn: default_hash_fn(),
			default_ttl_ms: defaults::DEFAULT_TTL_DURATION_MS,
			fresh_ms: defaults::DEFAULT_FRESH_DURATION_MS,
			retry_policy: defaults::default_retry_policy(),
		}
	}
}

/// Builder for [`ClientOptions`].
pub struct ClientBuilder<T, E> {
	options: ClientOptions<T, E>,
}
impl<T, E> ClientBuilder<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	/// Start from the default configuration.
	pub fn new() -> Self {
		Self { options: ClientOptions::default() }
	}

	/// Override the backing cache store.
	pub fn cache(mut self, cache: Arc<dyn CacheStore<T>>) -> Self {
		self.options.cache = cache;

		self
	}

	/// Override the key-hashing function.
	pub fn hash_fn(mut self, hash_fn: HashFn) -> Self {
		self.options.hash_fn = hash_fn;

		self
	}

	/// Override the default write TTL.
	pub fn default_ttl_ms(mut self, ttl_ms: Millis) -> Self {
		self.options.default_ttl_ms = ttl_ms;

		self
	}

	/// Override the fresh-window duration.
	pub fn fresh_ms(mut self, fresh_ms: Millis) -> Self {
		self.options.fresh_ms = fresh_ms;

		self
	}

	/// Override the retry policy.
	pub fn retry_policy(mut self, retry_policy: Arc<dyn RetryPolicy<E>>) -> Self {
		self.options.retry_policy = retry_policy;

		self
	}

	/// Finalise into a [`ClientOptions`] value.
	///
	/// Fails validation (per §7's `Validation` error category) when
	/// `fresh_ms > default_ttl_ms`: the data model defines `stale` as the
	/// age range `[fresh_ms, ttl_ms)`, so a `fresh_ms` past the TTL leaves no
	/// entry ever reachable as `stale` — every entry is either fresh or
	/// already expired, silently dropping the revalidate-in-background path
	/// §4.5 describes.
	pub fn build(self) -> Result<ClientOptions<T, E>> {
		if self.options.fresh_ms > self.options.default_ttl_ms {
			return Err(Error::Validation {
				field: "fresh_ms",
				reason: format!(
					"fresh_ms ({}) must not exceed default_ttl_ms ({}), or no entry can ever be served as stale",
					self.options.fresh_ms, self.options.default_ttl_ms
				),
			});
		}

		Ok(self.options)
	}
}
impl<T, E> Default for ClientBuilder<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

/// Build the [`CacheManager`] a [`Client`](super::Client) wires up from
/// `options`, attached to `bus` so `set`/`invalidate` publish events.
pub(crate) fn cache_manager_from<T, E>(
	options: &ClientOptions<T, E>,
	bus: Arc<crate::pubsub::PubSub<crate::query::state::QuerySharedState<T, E>, crate::pubsub::Event<T, E>>>,
) -> CacheManager<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	CacheManager::new(options.cache.clone(), options.hash_fn.clone(), options.default_ttl_ms).with_bus(bus)
}
