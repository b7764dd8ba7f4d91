//! No-op cache store: every operation succeeds trivially and nothing is ever
//! retained.

// std
use std::marker::PhantomData;
// crates.io
use async_trait::async_trait;
// self
use crate::{cache::{entry::CacheEntry, store::CacheStore}, clock::Millis, key::Hash};

/// A store that retains nothing: `get`/`get_entry` always return `None`, and
/// every mutating operation is a no-op.
///
/// Useful as a default when caching is explicitly disabled for a query or
/// mutation context, without special-casing the absence of a store
/// elsewhere.
pub struct NoCacheStore<V> {
	_value: PhantomData<fn() -> V>,
}
impl<V> NoCacheStore<V> {
	/// Build a no-op store.
	pub fn new() -> Self {
		Self { _value: PhantomData }
	}
}
impl<V> Default for NoCacheStore<V> {
	fn default() -> Self {
		Self::new()
	}
}
#[async_trait]
impl<V> CacheStore<V> for NoCacheStore<V>
where
	V: Clone + Send + Sync + 'static,
{
	async fn get(&self, _key: &Hash) -> Option<V> {
		None
	}

	async fn get_entry(&self, _key: &Hash) -> Option<CacheEntry<V>> {
		None
	}

	async fn set(&self, _key: Hash, _data: V, _ttl_ms: Millis) {}

	async fn delete(&self, _key: &Hash) {}

	async fn delete_prefix(&self, _prefix: &Hash) {}

	async fn clear(&self) {}
}
