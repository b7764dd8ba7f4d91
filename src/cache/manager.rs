//! `CacheManager`: a thin facade over a [`CacheStore`], mapping structured
//! keys to hashes and publishing mutation/invalidation events.

// std
use std::sync::Arc;
// self
use crate::{
	cache::store::CacheStore,
	clock::Millis,
	key::{Hash, HashFn, Key},
	pubsub::{Event, PubSub},
	query::state::{Origin, QueryState, QueryStateMetadata, QuerySharedState, Source},
};

/// Facade coordinating a [`CacheStore`], a key-hashing function, and an
/// optional bus to publish mutation/invalidation events onto.
///
/// Only owns the store/hash/publish concerns; fetch orchestration lives in
/// the query engine, one layer up.
pub struct CacheManager<T, E> {
	store: Arc<dyn CacheStore<T>>,
	hash_fn: HashFn,
	default_ttl_ms: Millis,
	bus: Option<Arc<PubSub<QuerySharedState<T, E>, Event<T, E>>>>,
}
impl<T, E> CacheManager<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	/// Build a manager over `store`, hashing keys with `hash_fn` and
	/// defaulting writes without an explicit TTL to `default_ttl_ms`.
	pub fn new(store: Arc<dyn CacheStore<T>>, hash_fn: HashFn, default_ttl_ms: Millis) -> Self {
		Self { store, hash_fn, default_ttl_ms, bus: None }
	}

	/// Attach a bus so `set`/`invalidate` publish events after writing.
	pub fn with_bus(mut self, bus: Arc<PubSub<QuerySharedState<T, E>, Event<T, E>>>) -> Self {
		self.bus = Some(bus);

		self
	}

	/// Hash a key the same way this manager does internally; exposed so
	/// callers (notably the query engine) can address the same topic.
	pub fn hash(&self, key: &Key) -> Hash {
		(self.hash_fn)(key)
	}

	/// Current value for `key`, if present and not expired.
	pub async fn get(&self, key: &Key) -> Option<T> {
		self.store.get(&self.hash(key)).await
	}

	/// Write `data` for `key`, publishing a `mutation` event on its topic
	/// when a bus is configured.
	pub async fn set(&self, key: &Key, data: T, ttl_ms: Option<Millis>) {
		let hash = self.hash(key);
		let ttl = ttl_ms.unwrap_or(self.default_ttl_ms);

		self.store.set(hash.clone(), data.clone(), ttl).await;

		if let Some(bus) = &self.bus {
			let event = Event::Mutation {
				origin: Origin::Provider,
				state: QueryState::Success { data },
				metadata: QueryStateMetadata {
					origin: Origin::Provider,
					source: Source::Mutation,
					cache: None,
				},
			};

			bus.publish(&hash, event, &[]).await;
		}
	}

	/// Remove the entry for `key`, if present. Does not publish anything —
	/// only `invalidate` fans out an event.
	pub async fn delete(&self, key: &Key) {
		self.store.delete(&self.hash(key)).await;
	}

	/// Delete every entry whose hash starts with `hash(key)`, then publish an
	/// `invalidation` event on every currently active topic whose hash also
	/// starts with `hash(key)` — not just the exact topic.
	///
	/// Because [`default_hash_key`](crate::key::default_hash_key) is
	/// prefix-preserving, a shorter key's hash is a string prefix of every
	/// longer key that extends it, so invalidating `["account"]` reaches
	/// subscribers bound to `["account", "user", 1]` as well as the exact
	/// `["account"]` topic.
	pub async fn invalidate(&self, key: &Key) {
		let hash = self.hash(key);

		tracing::debug!(%hash, "invalidating cache entries under prefix");

		self.store.delete_prefix(&hash).await;

		if let Some(bus) = &self.bus {
			for topic in bus.topics().await {
				if topic.starts_with(&hash) {
					bus.publish(&topic, Event::Invalidation { origin: Origin::Provider }, &[])
						.await;
				}
			}
		}
	}

	/// Remove every entry in the underlying store.
	pub async fn clear(&self) {
		self.store.clear().await;
	}
}
impl<T, E> Clone for CacheManager<T, E> {
	fn clone(&self) -> Self {
		Self {
			store: self.store.clone(),
			hash_fn: self.hash_fn.clone(),
			default_ttl_ms: self.default_ttl_ms,
			bus: self.bus.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{cache::persistent::PersistentStore, key::default_hash_fn};

	fn key(id: &str) -> Key {
		vec![id.into()]
	}

	#[tokio::test]
	async fn set_then_get_round_trips_through_the_hash() {
		let store: Arc<dyn CacheStore<&str>> = Arc::new(PersistentStore::new());
		let manager: CacheManager<&str, String> = CacheManager::new(store, default_hash_fn(), 60_000);

		manager.set(&key("a"), "value", None).await;

		assert_eq!(manager.get(&key("a")).await, Some("value"));
	}

	#[tokio::test]
	async fn invalidate_deletes_every_prefix_matching_entry() {
		let store: Arc<dyn CacheStore<&str>> = Arc::new(PersistentStore::new());
		let manager: CacheManager<&str, String> = CacheManager::new(store, default_hash_fn(), 60_000);

		manager.set(&key("a"), "value", None).await;
		manager.invalidate(&key("a")).await;

		assert!(manager.get(&key("a")).await.is_none());
	}

	#[tokio::test]
	async fn set_publishes_a_mutation_event_when_a_bus_is_attached() {
		let store: Arc<dyn CacheStore<&str>> = Arc::new(PersistentStore::new());
		let bus: Arc<PubSub<QuerySharedState<&str, String>, Event<&str, String>>> =
			Arc::new(PubSub::new());
		let manager: CacheManager<&str, String> =
			CacheManager::new(store, default_hash_fn(), 60_000).with_bus(bus.clone());
		let hash = manager.hash(&key("a"));
		let received = Arc::new(tokio::sync::Mutex::new(None));
		let received_clone = received.clone();

		bus.subscribe(
			hash.clone(),
			Arc::new(move |event: Event<&str, String>| {
				let received = received_clone.clone();

				Box::pin(async move {
					*received.lock().await = Some(event);
				})
			}),
			crate::pubsub::StateInit::Value(QuerySharedState::default()),
		)
		.await;

		manager.set(&key("a"), "value", None).await;

		let event = received.lock().await.take();

		assert!(matches!(event, Some(Event::Mutation { .. })));
	}

	#[tokio::test]
	async fn invalidate_fans_out_to_every_topic_whose_hash_extends_the_given_key() {
		let store: Arc<dyn CacheStore<&str>> = Arc::new(PersistentStore::new());
		let bus: Arc<PubSub<QuerySharedState<&str, String>, Event<&str, String>>> =
			Arc::new(PubSub::new());
		let manager: CacheManager<&str, String> =
			CacheManager::new(store, default_hash_fn(), 60_000).with_bus(bus.clone());
		let child_key: Key = vec!["account".into(), "user".into(), 1i64.into()];
		let unrelated_key: Key = vec!["order".into(), 1i64.into()];
		let child_hash = manager.hash(&child_key);
		let unrelated_hash = manager.hash(&unrelated_key);
		let child_received = Arc::new(tokio::sync::Mutex::new(false));
		let unrelated_received = Arc::new(tokio::sync::Mutex::new(false));

		bus.subscribe(
			child_hash,
			Arc::new({
				let flag = child_received.clone();

				move |_event: Event<&str, String>| {
					let flag = flag.clone();

					Box::pin(async move {
						*flag.lock().await = true;
					})
				}
			}),
			crate::pubsub::StateInit::Value(QuerySharedState::default()),
		)
		.await;
		bus.subscribe(
			unrelated_hash,
			Arc::new({
				let flag = unrelated_received.clone();

				move |_event: Event<&str, String>| {
					let flag = flag.clone();

					Box::pin(async move {
						*flag.lock().await = true;
					})
				}
			}),
			crate::pubsub::StateInit::Value(QuerySharedState::default()),
		)
		.await;

		manager.invalidate(&key("account")).await;

		assert!(*child_received.lock().await, "child topic must observe the invalidation");
		assert!(!*unrelated_received.lock().await, "unrelated topic must not observe it");
	}
}
