//! `ObservablePromise`: the only mechanism used for in-flight coalescing.
//!
//! Wraps a spawned future so that many callers can independently await its
//! result while also being able to peek at its completion status without
//! awaiting, turning a fire-and-forget background task into something
//! callers can also join on.

// std
use std::sync::Arc;
// crates.io
use tokio::sync::{Notify, RwLock};

/// Completion status of an [`ObservablePromise`], observable without
/// awaiting the result itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PromiseStatus {
	/// Still running.
	Pending,
	/// Completed successfully.
	Fulfilled,
	/// Completed with an error.
	Rejected,
}

enum Slot<T, E> {
	Pending,
	Fulfilled(T),
	Rejected(E),
}

/// A future that has already started running (spawned as a task) and can be
/// joined by any number of clones, each of which also sees the same
/// settlement.
pub struct ObservablePromise<T, E> {
	slot: Arc<RwLock<Slot<T, E>>>,
	settled: Arc<Notify>,
}
impl<T, E> ObservablePromise<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	/// Spawn `fut` and wrap it as an observable promise.
	pub fn spawn<Fut>(fut: Fut) -> Self
	where
		Fut: Future<Output = Result<T, E>> + Send + 'static,
	{
		let slot = Arc::new(RwLock::new(Slot::Pending));
		let settled = Arc::new(Notify::new());
		let task_slot = slot.clone();
		let task_settled = settled.clone();

		tokio::spawn(async move {
			let outcome = fut.await;

			{
				let mut guard = task_slot.write().await;

				*guard = match outcome {
					Ok(value) => Slot::Fulfilled(value),
					Err(error) => Slot::Rejected(error),
				};
			}
			task_settled.notify_waiters();
		});

		Self { slot, settled }
	}

	/// Current status, without waiting for completion.
	pub async fn status(&self) -> PromiseStatus {
		match &*self.slot.read().await {
			Slot::Pending => PromiseStatus::Pending,
			Slot::Fulfilled(_) => PromiseStatus::Fulfilled,
			Slot::Rejected(_) => PromiseStatus::Rejected,
		}
	}

	/// Await settlement and return the result. Safe to call from multiple
	/// clones concurrently; every caller observes the same outcome.
	pub async fn join(&self) -> Result<T, E> {
		loop {
			// Captured before the read lock is checked, not after: this is
			// `Notify`'s documented pattern for avoiding a missed wakeup if
			// settlement happens between the check and the await below.
			let notified = self.settled.notified();

			{
				let guard = self.slot.read().await;

				match &*guard {
					Slot::Fulfilled(value) => return Ok(value.clone()),
					Slot::Rejected(error) => return Err(error.clone()),
					Slot::Pending => {},
				}
			}

			notified.await;
		}
	}
}
impl<T, E> Clone for ObservablePromise<T, E> {
	fn clone(&self) -> Self {
		Self { slot: self.slot.clone(), settled: self.settled.clone() }
	}
}
