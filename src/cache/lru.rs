//! Approximate-LRU store: bounded, `O(1)`-amortized eviction.

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

struct Record<V> {
	entry: CacheEntry<V>,
	/// Time recently used — refreshed on every `get`/`get_entry`.
	tru_ms: Millis,
}

/// Bounded store approximating LRU eviction without a true recency list.
///
/// On `set`, once at capacity, a bounded scan of the map looks for entries to
/// drop: expired entries, or entries idle for at least `tru_threshold_ms`.
/// The scan stops after `min(ceil(capacity*0.05), 64)` deletions or once it
/// has visited every entry, whichever comes first; the key being inserted is
/// never a candidate. This trades eviction precision for an amortized
/// constant-time `set`.
pub struct ApproxLruStore<V> {
	capacity: usize,
	tru_threshold_ms: Millis,
	entries: RwLock<HashMap<Hash, Record<V>>>,
}
impl<V> ApproxLruStore<V> {
	/// Build a store holding at most `capacity` entries, treating entries
	/// untouched for `tru_threshold_ms` as eviction candidates.
	pub fn new(capacity: usize, tru_threshold_ms: Millis) -> Self {
		Self { capacity, tru_threshold_ms, entries: RwLock::new(HashMap::new()) }
	}

	/// Number of entries currently stored, including any not yet reaped as
	/// expired. Primarily useful in tests.
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}
}
#[async_trait]
impl<V> CacheStore<V> for ApproxLruStore<V>
where
	V: Clone + Send + Sync + 'static,
{
	async fn get(&self, key: &Hash) -> Option<V> {
		self.get_entry(key).await.map(|entry| entry.data)
	}

	async fn get_entry(&self, key: &Hash) -> Option<CacheEntry<V>> {
		let now = now_ms();
		let mut map = self.entries.write().await;
		let expired = map.get(key).is_some_and(|record| record.entry.is_expired(now));

		if expired {
			map.remove(key);

			return None;
		}

		let record = map.get_mut(key)?;

		record.tru_ms = now;

		Some(record.entry.clone())
	}

	async fn set(&self, key: Hash, data: V, ttl_ms: Millis) {
		let now = now_ms();
		let mut map = self.entries.write().await;

		if map.len() >= self.capacity && !map.contains_key(&key) {
			evict(&mut map, self.capacity, now, self.tru_threshold_ms, &key);
		}

		map.insert(key, Record { entry: CacheEntry::new(data, ttl_ms, now), tru_ms: now });
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

fn evict<V>(
	map: &mut HashMap<Hash, Record<V>>,
	capacity: usize,
	now: Millis,
	tru_threshold_ms: Millis,
	inserting: &Hash,
) {
	let max_deletions = ((capacity as f64 * 0.05).ceil() as usize).clamp(1, 64);
	let mut victims = Vec::with_capacity(max_deletions);

	for (key, record) in map.iter() {
		if key == inserting {
			continue;
		}

		let idle = now.saturating_sub(record.tru_ms) >= tru_threshold_ms;

		if record.entry.is_expired(now) || idle {
			victims.push(key.clone());

			if victims.len() >= max_deletions {
				break;
			}
		}
	}

	for key in victims {
		map.remove(&key);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn hash(s: &str) -> Hash {
		Hash::new(s.to_owned())
	}

	#[tokio::test]
	async fn get_returns_none_past_expiry() {
		let store = ApproxLruStore::new(10, 60_000);

		store.set(hash("k"), "v", 0).await;

		assert!(store.get(&hash("k")).await.is_none());
	}

	#[tokio::test]
	async fn eviction_never_drops_the_key_being_inserted() {
		let store = ApproxLruStore::new(4, 0);

		for i in 0..4 {
			store.set(hash(&format!("k{i}")), i, 60_000).await;
		}

		// All four existing entries are idle (threshold 0), so the insert of a
		// fifth key should trigger eviction but must retain the new key.
		store.set(hash("k4"), 4, 60_000).await;

		assert_eq!(store.get(&hash("k4")).await, Some(4));
	}

	#[tokio::test]
	async fn delete_prefix_removes_matching_keys_only() {
		let store = ApproxLruStore::new(10, 60_000);

		store.set(hash("user:1"), "a", 60_000).await;
		store.set(hash("user:2"), "b", 60_000).await;
		store.set(hash("order:1"), "c", 60_000).await;

		store.delete_prefix(&hash("user:")).await;

		assert!(store.get(&hash("user:1")).await.is_none());
		assert!(store.get(&hash("user:2")).await.is_none());
		assert_eq!(store.get(&hash("order:1")).await, Some("c"));
	}
}
