//! The event type carried over the bus.

// self
use crate::query::state::{Origin, QueryState, QueryStateMetadata};

/// One message delivered to a topic's listeners.
///
/// `Mutation` carries a full `QueryState` (always the `Success` variant, by
/// construction) rather than a bare value so that `updateQuery` can apply it
/// through the same code path as an ordinary `transition` — both end up
/// calling `dataFn`/`stateFn` identically.
#[derive(Clone, Debug)]
pub enum Event<T, E> {
	/// An ordinary query-state transition.
	Transition {
		/// Who produced this transition.
		origin: Origin,
		/// The new state.
		state: QueryState<T, E>,
		/// Metadata describing how the new state was produced.
		metadata: QueryStateMetadata,
	},
	/// Emitted by `CacheManager::set` after a successful cache write.
	Mutation {
		/// Always [`Origin::Provider`]: mutations are always observed as
		/// coming from outside the query context itself.
		origin: Origin,
		/// The written value, wrapped as a success state.
		state: QueryState<T, E>,
		/// Metadata describing the write (`source: Mutation`).
		metadata: QueryStateMetadata,
	},
	/// Emitted by `CacheManager::invalidate` after deleting matching
	/// entries.
	Invalidation {
		/// Always [`Origin::Provider`].
		origin: Origin,
	},
}
impl<T, E> Event<T, E> {
	/// Who produced this event.
	pub fn origin(&self) -> Origin {
		match self {
			Event::Transition { origin, .. }
			| Event::Mutation { origin, .. }
			| Event::Invalidation { origin } => *origin,
		}
	}
}
