//! The `CacheStore` trait every cache backend implements.

// crates.io
use async_trait::async_trait;
// self
use crate::{cache::entry::CacheEntry, clock::Millis, key::Hash};

/// TTL-aware key-value store, addressed by [`Hash`].
///
/// Failures are non-fatal for callers: adapters translate any
/// backend-specific error into the sentinel "absent" outcome (for reads) or a
/// silent no-op (for writes/deletes) rather than propagating a `Result` —
/// higher layers treat any cache I/O failure as a miss, per the crate's
/// error-swallowing policy for this class of failure.
#[async_trait]
pub trait CacheStore<V>: Send + Sync
where
	V: Clone + Send + Sync + 'static,
{
	/// Current value for `key`, if present and not expired.
	async fn get(&self, key: &Hash) -> Option<V>;

	/// Current entry for `key`, if present and not expired. The returned
	/// entry's TTL bookkeeping reflects the moment of the call.
	async fn get_entry(&self, key: &Hash) -> Option<CacheEntry<V>>;

	/// Write (overwriting) an entry with insertion timestamp `now`.
	async fn set(&self, key: Hash, data: V, ttl_ms: Millis);

	/// Remove the entry for `key`, if present. Idempotent.
	async fn delete(&self, key: &Hash);

	/// Remove every entry whose hash, interpreted as a string, starts with
	/// `prefix`. An `O(n)` scan is an acceptable implementation.
	async fn delete_prefix(&self, prefix: &Hash);

	/// Remove every entry.
	async fn clear(&self);
}
