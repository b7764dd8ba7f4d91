//! `SubscriberHandle`: a single context's ownership of "its current topic"
//! on the bus.

// std
use std::sync::Arc;
// crates.io
use tokio::sync::Mutex;
// self
use crate::{
	key::Hash,
	pubsub::bus::{Listener, ListenerId, PubSub, StateInit, StateUpdate},
};

/// Owns at most one subscription at a time and knows how to publish onto it
/// while excluding itself from its own broadcast.
///
/// `use_topic` atomically moves the subscription from whatever topic (if
/// any) it previously held to a new one: the old subscription is torn down
/// only when the topic actually changes, so repeated `execute` calls on the
/// same key do not churn the bus.
pub struct SubscriberHandle<S, M> {
	bus: Arc<PubSub<S, M>>,
	listener: Listener<M>,
	current: Mutex<Option<(Hash, ListenerId)>>,
}
impl<S, M> SubscriberHandle<S, M>
where
	M: Clone,
{
	/// Build a handle bound to `bus`, registering `listener` whenever it
	/// subscribes to a topic.
	pub fn new(bus: Arc<PubSub<S, M>>, listener: Listener<M>) -> Self {
		Self { bus, listener, current: Mutex::new(None) }
	}

	/// Move the subscription to `topic` (or drop it entirely, for `None`),
	/// applying `state_init` when a new subscription is created.
	pub async fn use_topic(&self, topic: Option<Hash>, state_init: StateInit<S>) {
		let mut current = self.current.lock().await;
		let changed = current.as_ref().map(|(t, _)| t) != topic.as_ref();

		if !changed {
			return;
		}

		if let Some((old_topic, old_id)) = current.take() {
			self.bus.unsubscribe(&old_topic, old_id).await;
		}

		if let Some(topic) = topic {
			let id = self.bus.subscribe(topic.clone(), self.listener.clone(), state_init).await;

			*current = Some((topic, id));
		}
	}

	/// The topic currently held, if any.
	pub async fn current_topic(&self) -> Option<Hash> {
		self.current.lock().await.as_ref().map(|(topic, _)| topic.clone())
	}

	/// Publish `data` on the current topic, excluding this handle's own
	/// listener from the broadcast. A no-op if no topic is currently held.
	pub async fn publish(&self, data: M) {
		let current = self.current.lock().await.clone();

		if let Some((topic, id)) = current {
			self.bus.publish(&topic, data, &[id]).await;
		}
	}

	/// Current shared state for the held topic, if any.
	pub async fn get_state(&self) -> Option<S>
	where
		S: Clone,
	{
		let current = self.current.lock().await.clone();
		let topic = current?.0;

		self.bus.get_state(&topic).await
	}

	/// Update the shared state for the held topic, if any.
	pub async fn set_state(&self, update: StateUpdate<S>) {
		let current = self.current.lock().await.clone();

		if let Some((topic, _)) = current {
			self.bus.set_state(&topic, update).await;
		}
	}

	/// Drop the current subscription, if any. Idempotent.
	pub async fn dispose(&self) {
		let mut current = self.current.lock().await;

		if let Some((old_topic, old_id)) = current.take() {
			self.bus.unsubscribe(&old_topic, old_id).await;
		}
	}
}
