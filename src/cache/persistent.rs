//! Unbounded persistent store: no eviction, expiry enforced at read time.

// std
use std::collections::HashMap;
// crates.io
use async_trait::async_trait;
use tokio::sync::RwLock;
// self
use crate::{
	cache::{entry::CacheEntry, store::CacheStore},
	clock::{Millis, now_ms},
	key::Hash,
};

/// A plain key-to-entry map with no capacity limit and no eviction.
///
/// Entries are only removed by explicit `delete`/`delete_prefix`/`clear`, or
/// lazily at read time once expired.
pub struct PersistentStore<V> {
	entries: RwLock<HashMap<Hash, CacheEntry<V>>>,
}
impl<V> PersistentStore<V> {
	/// Build an empty store.
	pub fn new() -> Self {
		Self { entries: RwLock::new(HashMap::new()) }
	}
}
impl<V> Default for PersistentStore<V> {
	fn default() -> Self {
		Self::new()
	}
}
#[async_trait]
impl<V> CacheStore<V> for PersistentStore<V>
where
	V: Clone + Send + Sync + 'static,
{
	async fn get(&self, key: &Hash) -> Option<V> {
		self.get_entry(key).await.map(|entry| entry.data)
	}

	async fn get_entry(&self, key: &Hash) -> Option<CacheEntry<V>> {
		let now = now_ms();
		let mut map = self.entries.write().await;

		match map.get(key) {
			Some(entry) if entry.is_expired(now) => {
				map.remove(key);

				None
			},
			Some(entry) => Some(entry.clone()),
			None => None,
		}
	}

	async fn set(&self, key: Hash, data: V, ttl_ms: Millis) {
		self.entries.write().await.insert(key, CacheEntry::new(data, ttl_ms, now_ms()));
	}

	async fn delete(&self, key: &Hash) {
		self.entries.write().await.remove(key);
	}

	async fn delete_prefix(&self, prefix: &Hash) {
		self.entries.write().await.retain(|key, _| !key.starts_with(prefix));
	}

	async fn clear(&self) {
		self.entries.write().await.clear();
	}
}
