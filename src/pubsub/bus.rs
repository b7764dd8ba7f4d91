//! The topic-addressed publish/subscribe bus.
//!
//! A single `RwLock` guarding a `HashMap`: read locks used to clone out what's
//! needed, write locks held only long enough to mutate the map, and
//! listener/user code always invoked after the lock has been dropped.

// std
use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::atomic::{AtomicU64, Ordering},
};
// crates.io
use tokio::sync::RwLock;
// self
use crate::key::Hash;

/// Identity of a registered listener, used to unsubscribe and to exclude a
/// publisher from its own broadcast.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ListenerId(u64);

type ListenerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A listener callback: takes an owned message, returns a future the bus
/// awaits and discards.
pub type Listener<M> = std::sync::Arc<dyn Fn(M) -> ListenerFuture + Send + Sync>;

/// How to derive a topic's next shared state from what (if anything) it
/// currently holds.
pub enum StateInit<S> {
	/// Use this value outright.
	Value(S),
	/// Derive the new value from whatever is currently stored, if any.
	Derive(Box<dyn FnOnce(Option<&S>) -> S + Send>),
}
impl<S> StateInit<S> {
	fn apply(self, current: Option<&S>) -> S {
		match self {
			StateInit::Value(value) => value,
			StateInit::Derive(f) => f(current),
		}
	}
}

/// How to update a topic's shared state in place via `setState`.
pub enum StateUpdate<S> {
	/// Replace it outright.
	Value(S),
	/// Derive the replacement from the current value.
	Derive(Box<dyn FnOnce(&S) -> S + Send>),
}

struct Topic<S, M> {
	listeners: Vec<(ListenerId, Listener<M>)>,
	state: S,
}

/// Topic-addressed publish/subscribe bus with per-topic shared state.
///
/// `S` is the shared state type held per topic (used for in-flight
/// coalescing); `M` is the message type delivered to listeners on
/// `publish`.
pub struct PubSub<S, M> {
	topics: RwLock<HashMap<Hash, Topic<S, M>>>,
	next_id: AtomicU64,
}
impl<S, M> PubSub<S, M> {
	/// Build an empty bus.
	pub fn new() -> Self {
		Self { topics: RwLock::new(HashMap::new()), next_id: AtomicU64::new(0) }
	}

	fn fresh_id(&self) -> ListenerId {
		ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
	}

	/// Register `listener` on `topic`, creating the topic if absent.
	///
	/// `state_init` is applied against the topic's existing state (`None` if
	/// the topic did not exist) either way, so every subscribe call — not
	/// just the first — has a chance to refresh the shared state.
	pub async fn subscribe(
		&self,
		topic: Hash,
		listener: Listener<M>,
		state_init: StateInit<S>,
	) -> ListenerId {
		let id = self.fresh_id();
		let mut topics = self.topics.write().await;

		match topics.get_mut(&topic) {
			Some(record) => {
				record.state = state_init.apply(Some(&record.state));
				record.listeners.push((id, listener));
			},
			None => {
				let state = state_init.apply(None);

				topics.insert(topic, Topic { listeners: vec![(id, listener)], state });
			},
		}

		id
	}

	/// Remove `listener_id` from `topic`; deletes the topic once its
	/// listener set becomes empty.
	pub async fn unsubscribe(&self, topic: &Hash, listener_id: ListenerId) {
		let mut topics = self.topics.write().await;
		let Some(record) = topics.get_mut(topic) else { return };

		record.listeners.retain(|(id, _)| *id != listener_id);

		if record.listeners.is_empty() {
			topics.remove(topic);
		}
	}

	/// Invoke every listener on `topic` not present in `ignore`, in
	/// insertion order, with a clone of `data`.
	///
	/// Fire-and-forget: listener futures are awaited here (so errors/panics
	/// inside them are the listener's own problem) but their outcome is
	/// never surfaced to the publisher. Topics with no listeners (or that
	/// don't exist) are a silent no-op.
	pub async fn publish(&self, topic: &Hash, data: M, ignore: &[ListenerId])
	where
		M: Clone,
	{
		let listeners = {
			let topics = self.topics.read().await;

			match topics.get(topic) {
				Some(record) => record.listeners.clone(),
				None => return,
			}
		};

		for (id, listener) in listeners {
			if ignore.contains(&id) {
				continue;
			}

			listener(data.clone()).await;
		}
	}

	/// Current shared state for `topic`, if it exists.
	pub async fn get_state(&self, topic: &Hash) -> Option<S>
	where
		S: Clone,
	{
		self.topics.read().await.get(topic).map(|record| record.state.clone())
	}

	/// Update `topic`'s shared state in place. A no-op if the topic does not
	/// exist (there is nothing to attach the state to).
	pub async fn set_state(&self, topic: &Hash, update: StateUpdate<S>) {
		let mut topics = self.topics.write().await;

		if let Some(record) = topics.get_mut(topic) {
			record.state = match update {
				StateUpdate::Value(value) => value,
				StateUpdate::Derive(f) => f(&record.state),
			};
		}
	}

	/// Every `(topic, state)` pair currently registered.
	pub async fn entries(&self) -> Vec<(Hash, S)>
	where
		S: Clone,
	{
		self.topics.read().await.iter().map(|(k, v)| (k.clone(), v.state.clone())).collect()
	}

	/// Every currently-registered topic's shared state.
	pub async fn states(&self) -> Vec<S>
	where
		S: Clone,
	{
		self.topics.read().await.values().map(|record| record.state.clone()).collect()
	}

	/// Every currently-registered topic.
	pub async fn topics(&self) -> Vec<Hash> {
		self.topics.read().await.keys().cloned().collect()
	}

	/// Number of listeners currently registered on `topic`.
	pub async fn subscriber_count(&self, topic: &Hash) -> usize {
		self.topics.read().await.get(topic).map(|record| record.listeners.len()).unwrap_or(0)
	}
}
impl<S, M> Default for PubSub<S, M> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	};
	// self
	use super::*;

	fn hash(s: &str) -> Hash {
		Hash::new(s.to_owned())
	}

	fn counting_listener(counter: Arc<AtomicUsize>) -> Listener<u32> {
		Arc::new(move |_data: u32| {
			let counter = counter.clone();

			Box::pin(async move {
				counter.fetch_add(1, Ordering::SeqCst);
			})
		})
	}

	#[tokio::test]
	async fn publish_invokes_listeners_not_in_the_ignore_list() {
		let bus: PubSub<(), u32> = PubSub::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let id =
			bus.subscribe(hash("t"), counting_listener(calls.clone()), StateInit::Value(())).await;

		bus.publish(&hash("t"), 1, &[]).await;
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		bus.publish(&hash("t"), 2, &[id]).await;
		assert_eq!(calls.load(Ordering::SeqCst), 1, "ignored listener must not be invoked");
	}

	#[tokio::test]
	async fn unsubscribe_removes_empty_topics() {
		let bus: PubSub<(), u32> = PubSub::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let id =
			bus.subscribe(hash("t"), counting_listener(calls), StateInit::Value(())).await;

		assert_eq!(bus.subscriber_count(&hash("t")).await, 1);

		bus.unsubscribe(&hash("t"), id).await;

		assert_eq!(bus.subscriber_count(&hash("t")).await, 0);
		assert!(!bus.topics().await.contains(&hash("t")));
	}

	#[tokio::test]
	async fn get_state_and_set_state_round_trip() {
		let bus: PubSub<u32, u32> = PubSub::new();
		let calls = Arc::new(AtomicUsize::new(0));

		bus.subscribe(hash("t"), counting_listener(calls), StateInit::Value(1)).await;

		assert_eq!(bus.get_state(&hash("t")).await, Some(1));

		bus.set_state(&hash("t"), StateUpdate::Derive(Box::new(|s| s + 1))).await;

		assert_eq!(bus.get_state(&hash("t")).await, Some(2));
	}
}
