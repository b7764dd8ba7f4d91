//! `DetachedClient`: a standalone session overlaying the shared cache with a
//! local, trackable write log, letting a caller run queries/mutations in
//! isolation and later replay just what it wrote.
//!
//! A point-in-time session that can be handed off and later reconciled back:
//! a writable overlay that records its own deltas for replay.

// std
use std::{ops::Deref, sync::Arc};
// self
use crate::{
	cache::{CacheStore, Patch, TrackingStore},
	client::{Client, options::ClientOptions},
};

/// A [`Client`] whose cache is a private [`TrackingStore`] overlay in front
/// of the shared store it was built from, paired with a fresh, independent
/// bus: reads see everything already committed to the shared store, and
/// writes delegate straight through to it as usual, but every write is also
/// appended to the overlay's own log so [`DetachedClient::commit`] can hand
/// back just the records this session produced, for replay elsewhere via
/// [`crate::cache::apply_patch`].
pub struct DetachedClient<T, E> {
	client: Client<T, E>,
	tracking: Arc<TrackingStore<T>>,
}
impl<T, E> DetachedClient<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	/// Build a detached session overlaying `options.cache`, otherwise
	/// sharing the same hashing/TTL/retry configuration.
	pub fn new(options: &ClientOptions<T, E>) -> Self {
		let tracking = Arc::new(TrackingStore::new(options.cache.clone()));
		let inner: Arc<dyn CacheStore<T>> = tracking.clone();
		let detached_options = ClientOptions {
			cache: inner,
			hash_fn: options.hash_fn.clone(),
			default_ttl_ms: options.default_ttl_ms,
			fresh_ms: options.fresh_ms,
			retry_policy: options.retry_policy.clone(),
		};

		Self { client: Client::new(detached_options), tracking }
	}

	/// The underlying client, for callers that want it by value (e.g. to
	/// hand off to code written against `Client<T, E>`).
	pub fn client(&self) -> &Client<T, E> {
		&self.client
	}

	/// Wait for every query/mutation this session kicked off to settle, then
	/// drain and return the writes it recorded.
	pub async fn commit(&self) -> Patch<T> {
		self.client.wait_all().await;

		self.tracking.take_patch().await
	}
}
impl<T, E> Deref for DetachedClient<T, E> {
	type Target = Client<T, E>;

	fn deref(&self) -> &Self::Target {
		&self.client
	}
}
