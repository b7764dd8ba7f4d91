//! The query algorithms themselves: `execute`, `runActiveQuery`,
//! `runBackgroundQuery`, `runQuery`, `updateQuery`, `use`, `reset`, and
//! `dispose`.
//!
//! A single-flight loop: coalesce concurrent callers onto one in-flight
//! fetch, publish the settled value to whoever is waiting, and drive an
//! explicit load/refresh/success/failure/invalidate state machine, built on
//! the five-variant `QueryState` union.

// std
use std::convert::Infallible;
// self
use crate::{
	clock::CancelToken,
	key::{Hash, Key},
	pubsub::{Event, StateInit, StateUpdate},
	query::{
		context::{ExecuteOptions, QueryContext},
		promise::{ObservablePromise, PromiseStatus},
		state::{CacheDirective, Origin, QueryState, QueryStateMetadata, QuerySharedState, ResetTarget, Source},
	},
};

/// Outcome of a call to [`QueryContext::execute`].
pub struct ExecuteOutcome<T, E> {
	/// The state to render immediately.
	pub state: QueryState<T, E>,
	/// A background refresh already in flight, present only when `state`
	/// was served from a stale cache entry.
	pub next: Option<ObservablePromise<QueryState<T, E>, Infallible>>,
}

impl<T, E> QueryContext<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	/// Bind this context to `key`, resolve a value for it (from cache or by
	/// running `queryFn`), and return the state to render.
	pub async fn execute(self: &std::sync::Arc<Self>, key: Key, opts: ExecuteOptions) -> ExecuteOutcome<T, E> {
		let hash = (self.hash_fn)(&key);

		self.bind_topic(&key, &hash).await;

		let cache = opts.cache.unwrap_or_default();
		let signal = opts.signal.unwrap_or_default();
		let fallback_ttl = opts.ttl_ms.unwrap_or(self.default_ttl_ms);

		if cache == CacheDirective::NoCache {
			let state = self.run_active_query(&key, &hash, cache, fallback_ttl, signal).await;

			return ExecuteOutcome { state, next: None };
		}

		let Some(entry) = self.cache.get_entry(&hash).await else {
			let state = self.run_active_query(&key, &hash, cache, fallback_ttl, signal).await;

			return ExecuteOutcome { state, next: None };
		};

		let now = crate::clock::now_ms();

		if entry.is_fresh(now, self.fresh_ms) {
			let state = QueryState::Success { data: entry.data };

			self.apply_self_transition(state.clone(), Source::Cache, Some(cache)).await;

			return ExecuteOutcome { state, next: None };
		}

		if cache == CacheDirective::Stale {
			let state = QueryState::Stale { data: entry.data };

			self.apply_self_transition(state.clone(), Source::Cache, Some(cache)).await;

			let next = self.run_background_query(&key, &hash, cache, fallback_ttl, signal).await;

			return ExecuteOutcome { state, next: Some(next) };
		}

		let state = self.run_active_query(&key, &hash, cache, fallback_ttl, signal).await;

		ExecuteOutcome { state, next: None }
	}

	/// Move the subscription to `key`'s topic, preserving whatever shared
	/// state (notably an in-flight promise) already exists there.
	async fn bind_topic(&self, key: &Key, hash: &Hash) {
		let init = match self.bus.get_state(hash).await {
			Some(shared) => StateInit::Value(shared),
			None => StateInit::Value(QuerySharedState::new(key.clone())),
		};

		self.subscriber.use_topic(Some(hash.clone()), init).await;
	}

	/// Run (or join) a foreground fetch: transitions to `loading` first,
	/// then awaits the settled state.
	async fn run_active_query(
		self: &std::sync::Arc<Self>,
		key: &Key,
		hash: &Hash,
		cache: CacheDirective,
		fallback_ttl: crate::clock::Millis,
		signal: CancelToken,
	) -> QueryState<T, E> {
		let current_data = self.get_state().await.data().cloned();

		self.apply_self_transition(QueryState::Loading { data: current_data }, Source::Query, Some(cache)).await;

		let promise = self.join_or_spawn(key, hash, cache, fallback_ttl, signal, Source::Query).await;

		match promise.join().await {
			Ok(state) => state,
			// `ObservablePromise<QueryState<T, E>, Infallible>` never settles
			// rejected: `run_query` always resolves to a final `QueryState`,
			// including the `Error` variant itself.
			Err(never) => match never {},
		}
	}

	/// Serve the caller immediately with a stale value while a background
	/// fetch runs; returns the promise so the caller can await it later.
	async fn run_background_query(
		self: &std::sync::Arc<Self>,
		key: &Key,
		hash: &Hash,
		cache: CacheDirective,
		fallback_ttl: crate::clock::Millis,
		signal: CancelToken,
	) -> ObservablePromise<QueryState<T, E>, Infallible> {
		self.join_or_spawn(key, hash, cache, fallback_ttl, signal, Source::BackgroundQuery).await
	}

	/// Join an already in-flight promise for `hash`, or spawn a new one.
	async fn join_or_spawn(
		self: &std::sync::Arc<Self>,
		key: &Key,
		hash: &Hash,
		cache: CacheDirective,
		fallback_ttl: crate::clock::Millis,
		signal: CancelToken,
		source: Source,
	) -> ObservablePromise<QueryState<T, E>, Infallible> {
		if let Some(shared) = self.bus.get_state(hash).await {
			if let Some(promise) = &shared.promise {
				if promise.status().await == PromiseStatus::Pending {
					tracing::debug!(%hash, "joining an in-flight fetch");

					return promise.clone();
				}
			}
		}

		tracing::debug!(%hash, ?source, "spawning a new fetch");

		let ctx = self.clone();
		let spawn_key = key.clone();
		let spawn_hash = hash.clone();

		let promise = ObservablePromise::spawn(async move {
			let state = ctx.run_query(spawn_key, spawn_hash, cache, fallback_ttl, source, signal).await;

			Ok(state)
		});

		self.bus
			.set_state(
				hash,
				StateUpdate::Derive({
					let promise = promise.clone();

					Box::new(move |old| QuerySharedState { key: old.key.clone(), promise: Some(promise.clone()) })
				}),
			)
			.await;

		promise
	}

	/// Run `queryFn` (through the retry driver), write or evict the cache
	/// entry accordingly, and apply + publish the settled transition.
	async fn run_query(
		self: std::sync::Arc<Self>,
		key: Key,
		hash: Hash,
		cache: CacheDirective,
		fallback_ttl: crate::clock::Millis,
		source: Source,
		signal: CancelToken,
	) -> QueryState<T, E> {
		let query_fn = self.query_fn.clone();
		let op_key = key.clone();
		let op_signal = signal.clone();
		let op = move || {
			let query_fn = query_fn.clone();
			let key = op_key.clone();
			let signal = op_signal.clone();

			async move { query_fn(key, signal).await }
		};

		let mut retry_handle = self.retry_handle_fn.clone().map(|f| {
			let f = f.clone();

			move |attempt: u32, err: &E| f(attempt, err)
		});
		let on_retry: Option<&mut dyn FnMut(u32, &E)> =
			retry_handle.as_mut().map(|f| f as &mut dyn FnMut(u32, &E));
		let result = crate::retry::exec_async_operation(op, self.retry_policy.as_ref(), on_retry).await;

		let state = match result {
			Ok(value) => {
				let ttl = (self.extract_ttl_fn)(&value, fallback_ttl);

				self.cache.set(hash.clone(), value.clone(), ttl).await;

				QueryState::Success { data: value }
			},
			Err(error) => {
				if !(self.keep_cache_on_error_fn)(&error) {
					tracing::debug!(%hash, "evicting cache entry after a failed fetch");

					self.cache.delete(&hash).await;
				}

				QueryState::Error { error }
			},
		};

		self.apply_self_transition(state.clone(), source, Some(cache)).await;

		state
	}

	/// Apply `state` to this context as if it were a self-originated
	/// transition: updates local state, runs handlers, then republishes to
	/// peers on the current topic.
	async fn apply_self_transition(
		self: &std::sync::Arc<Self>,
		state: QueryState<T, E>,
		source: Source,
		cache: Option<CacheDirective>,
	) {
		let event = Event::Transition {
			origin: Origin::SelfOrigin,
			state,
			metadata: QueryStateMetadata { origin: Origin::SelfOrigin, source, cache },
		};

		self.update_query(event).await;
	}

	/// Apply an incoming bus event (or a self-produced transition, routed
	/// through the same path) to this context's state, invoking handlers and
	/// republishing to peers when the event originated here.
	pub(crate) async fn update_query(self: &std::sync::Arc<Self>, event: Event<T, E>) {
		if self.subscriber.current_topic().await.is_none() {
			return;
		}

		if let Event::Invalidation { .. } = event {
			self.handle_invalidation().await;

			return;
		}

		let current = self.get_state().await;

		if !(self.filter_fn)(&current, &event) {
			return;
		}

		let (origin, state, metadata) = match event {
			Event::Transition { origin, state, metadata } => (origin, state, metadata),
			Event::Mutation { origin, state, metadata } => (origin, state, metadata),
			Event::Invalidation { .. } => unreachable!("handled above"),
		};

		*self.state.write().await = state.clone();

		if let Some(data) = state.data() {
			if let Some(data_fn) = &self.data_fn {
				data_fn(data.clone()).await;
			}
		}

		if let Some(error) = state.error() {
			if let Some(error_fn) = &self.error_fn {
				error_fn(error.clone()).await;
			}
		}

		if let Some(state_fn) = &self.state_fn {
			state_fn(state.clone()).await;
		}

		if origin == Origin::SelfOrigin {
			let event = Event::Transition { origin: Origin::Provider, state, metadata };

			self.subscriber.publish(event).await;
		}
	}

	/// An invalidation never overwrites local state directly; it kicks off a
	/// background refresh for whatever key this context currently holds, if
	/// any. A context whose shared state carries no key (nothing has ever
	/// bound this topic to a key through `execute`) has nothing to refetch.
	async fn handle_invalidation(self: &std::sync::Arc<Self>) {
		let Some(shared) = self.subscriber.get_state().await else { return };
		let Some(key) = shared.key else { return };
		let Some(hash) = self.subscriber.current_topic().await else { return };

		tracing::debug!(%hash, "invalidation received, kicking off a background refetch");

		self.run_background_query(
			&key,
			&hash,
			CacheDirective::default(),
			self.default_ttl_ms,
			crate::clock::CancelToken::new(),
		)
		.await;
	}

	/// Switch to a different key, preserving any existing shared state for
	/// its topic, and reset local state to `idle{placeholder}` without
	/// invoking any handler.
	pub async fn use_key(self: &std::sync::Arc<Self>, key: Key) {
		let hash = (self.hash_fn)(&key);

		self.bind_topic(&key, &hash).await;
		*self.state.write().await = QueryState::Idle { data: self.placeholder.clone() };
	}

	/// Reset local state to `idle{placeholder}`. `target: Handler` also
	/// invokes `stateFn` once more, with an `Initialization` source.
	pub async fn reset(&self, target: ResetTarget) {
		let state = QueryState::Idle { data: self.placeholder.clone() };

		*self.state.write().await = state.clone();

		if target == ResetTarget::Handler {
			if let Some(state_fn) = &self.state_fn {
				state_fn(state).await;
			}
		}
	}

	/// Drop this context's subscription. Idempotent.
	pub async fn dispose(&self) {
		self.subscriber.dispose().await;
	}
}
