//! The query state tagged union and the metadata attached to every
//! transition.

// std
use std::convert::Infallible;
// self
use crate::{key::Key, query::promise::ObservablePromise};

/// Who produced a bus event: the context observing it, or another context
/// routed through the bus.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
	/// Produced by this context itself.
	SelfOrigin,
	/// Routed through the bus from a peer context.
	Provider,
}

/// Where a transition's data came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Source {
	/// Served directly from the cache without invoking `queryFn`.
	Cache,
	/// Produced by a foreground (awaited) `queryFn` invocation.
	Query,
	/// Produced by a background (fire-and-forget) `queryFn` invocation.
	BackgroundQuery,
	/// Produced by `reset({target: handler})`.
	Initialization,
	/// Produced by `CacheManager.set`, observed as a transition.
	Mutation,
}

/// Cache consultation directive passed to `execute`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CacheDirective {
	/// Skip the cache entirely; always run the query function.
	NoCache,
	/// Only treat a fresh entry as usable; a stale entry is treated as a
	/// miss and triggers a foreground fetch.
	Fresh,
	/// Serve a stale entry immediately while refreshing in the background.
	#[default]
	Stale,
}

/// Metadata accompanying every `transition` event.
#[derive(Clone, Copy, Debug)]
pub struct QueryStateMetadata {
	/// Who produced this transition.
	pub origin: Origin,
	/// What produced this transition's data.
	pub source: Source,
	/// The cache directive in effect, if any (absent for e.g.
	/// initialization transitions).
	pub cache: Option<CacheDirective>,
}

/// Which state a `reset` call targets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResetTarget {
	/// Reset silently; no handler is invoked, nothing is published.
	Context,
	/// Reset and additionally invoke `stateFn` once with an
	/// [`Source::Initialization`] event.
	Handler,
}

/// Tagged union of the five states a query can be in.
///
/// Each variant carries exactly the fields that state allows — no nullable
/// fields shared across variants.
#[derive(Clone, Debug)]
pub enum QueryState<T, E> {
	/// No data has ever been loaded (or the context was reset); `data` may
	/// still carry a caller-supplied placeholder.
	Idle {
		/// Placeholder or previously-known data, if any.
		data: Option<T>,
	},
	/// A foreground or background fetch is in flight.
	Loading {
		/// Last known data, retained while the fetch runs.
		data: Option<T>,
	},
	/// A cached value past its fresh window is being served while a
	/// background refresh runs.
	Stale {
		/// The stale value being served.
		data: T,
	},
	/// The most recent fetch (or cache read) succeeded.
	Success {
		/// The successful value.
		data: T,
	},
	/// The most recent fetch failed.
	Error {
		/// The error produced by `queryFn` or the retry policy.
		error: E,
	},
}
impl<T, E> QueryState<T, E> {
	/// Construct the idle state with no placeholder data.
	pub fn idle() -> Self {
		QueryState::Idle { data: None }
	}

	/// The data carried by this state, if any (`Idle`/`Loading` may or may
	/// not carry data; `Error` never does).
	pub fn data(&self) -> Option<&T> {
		match self {
			QueryState::Idle { data } | QueryState::Loading { data } => data.as_ref(),
			QueryState::Stale { data } | QueryState::Success { data } => Some(data),
			QueryState::Error { .. } => None,
		}
	}

	/// The error carried by this state, if any.
	pub fn error(&self) -> Option<&E> {
		match self {
			QueryState::Error { error } => Some(error),
			_ => None,
		}
	}

	/// Whether this is the `Loading` variant.
	pub fn is_loading(&self) -> bool {
		matches!(self, QueryState::Loading { .. })
	}

	/// Whether this is the `Success` variant.
	pub fn is_success(&self) -> bool {
		matches!(self, QueryState::Success { .. })
	}

	/// Whether this is the `Error` variant.
	pub fn is_error(&self) -> bool {
		matches!(self, QueryState::Error { .. })
	}
}

/// Per-topic value held by the bus: the key that produced this topic, and
/// the in-flight promise (if any) currently being coalesced onto.
#[derive(Clone)]
pub struct QuerySharedState<T, E> {
	/// The key whose hash is this topic, if one is currently bound to it.
	pub key: Option<Key>,
	/// The in-flight `runQuery` invocation, if one is currently running.
	///
	/// `runQuery` never fails at the promise level — it always settles with
	/// a final `QueryState`, including the `Error` variant — so the
	/// promise's own error channel is `Infallible`.
	pub promise: Option<ObservablePromise<QueryState<T, E>, Infallible>>,
}
impl<T, E> QuerySharedState<T, E> {
	/// Build shared state bound to `key` with no in-flight promise.
	pub fn new(key: Key) -> Self {
		Self { key: Some(key), promise: None }
	}
}
impl<T, E> Default for QuerySharedState<T, E> {
	fn default() -> Self {
		Self { key: None, promise: None }
	}
}
