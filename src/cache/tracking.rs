//! Tracking wrapper: delegates to an inner store while also recording every
//! write into a side log, for later extraction as a [`Patch`].

// std
use std::sync::Arc;
// crates.io
use async_trait::async_trait;
use tokio::sync::Mutex;
// self
use crate::{cache::{entry::CacheEntry, store::CacheStore}, clock::Millis, key::Hash};

/// One recorded write, ready for replay into another store.
#[derive(Clone, Debug)]
pub struct PatchRecord<V> {
	/// Hash the value was stored under.
	pub hash: Hash,
	/// The stored value.
	pub data: V,
	/// Monotonic write timestamp, as passed to the inner store.
	pub time_ms: Millis,
	/// TTL, in milliseconds, as passed to the inner store.
	pub ttl_ms: Millis,
}

/// An ordered list of writes captured by a [`TrackingStore`].
///
/// Replay semantics (see [`apply_patch`]): for each record whose
/// `remaining_ttl(now) > 0`, call `store.set(hash, data, remaining_ttl)`.
/// Expired records are silently skipped.
pub type Patch<V> = Vec<PatchRecord<V>>;

/// Wraps an inner [`CacheStore`], additionally appending every `set` call
/// into a side log that can be drained as a [`Patch`].
///
/// Used by the detached client: writes still propagate to the wrapped store
/// like any other overlay, but the side log lets the session hand back just
/// what it wrote, for replay into a different store later.
pub struct TrackingStore<V> {
	inner: Arc<dyn CacheStore<V>>,
	log: Mutex<Patch<V>>,
}
impl<V> TrackingStore<V>
where
	V: Clone + Send + Sync + 'static,
{
	/// Wrap `inner`, starting with an empty log.
	pub fn new(inner: Arc<dyn CacheStore<V>>) -> Self {
		Self { inner, log: Mutex::new(Vec::new()) }
	}

	/// Snapshot every write recorded so far, without clearing the log.
	pub async fn patch(&self) -> Patch<V> {
		self.log.lock().await.clone()
	}

	/// Drain and return every write recorded so far.
	pub async fn take_patch(&self) -> Patch<V> {
		std::mem::take(&mut *self.log.lock().await)
	}
}
#[async_trait]
impl<V> CacheStore<V> for TrackingStore<V>
where
	V: Clone + Send + Sync + 'static,
{
	async fn get(&self, key: &Hash) -> Option<V> {
		self.inner.get(key).await
	}

	async fn get_entry(&self, key: &Hash) -> Option<CacheEntry<V>> {
		self.inner.get_entry(key).await
	}

	async fn set(&self, key: Hash, data: V, ttl_ms: Millis) {
		let time_ms = crate::clock::now_ms();

		self.log.lock().await.push(PatchRecord {
			hash: key.clone(),
			data: data.clone(),
			time_ms,
			ttl_ms,
		});
		self.inner.set(key, data, ttl_ms).await;
	}

	async fn delete(&self, key: &Hash) {
		self.inner.delete(key).await;
	}

	async fn delete_prefix(&self, prefix: &Hash) {
		self.inner.delete_prefix(prefix).await;
	}

	async fn clear(&self) {
		self.inner.clear().await;
	}
}

/// Replay a [`Patch`] into `store`: for every record whose TTL has not yet
/// fully elapsed relative to `now_ms`, write it with the remaining TTL.
/// Records that have already expired are skipped.
pub async fn apply_patch<V>(store: &dyn CacheStore<V>, patch: &Patch<V>, now_ms: Millis)
where
	V: Clone + Send + Sync + 'static,
{
	for record in patch {
		let entry = CacheEntry::new(record.data.clone(), record.ttl_ms, record.time_ms);
		let remaining = entry.remaining_ttl(now_ms);

		if remaining > 0 {
			store.set(record.hash.clone(), record.data.clone(), remaining).await;
		}
	}
}
