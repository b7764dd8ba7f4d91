//! `Client`: a small orchestration layer composing transient query/mutation
//! contexts over one shared cache/bus, plus introspection over everything
//! currently active on the bus.
//!
//! A `Clone`-able facade holding `Arc`-shared state, exposing operations
//! that build a handle, do the work, and return a plain value.

// std
use std::sync::Arc;
// self
use crate::{
	cache::CacheManager,
	clock::{CancelToken, Millis},
	client::options::{ClientOptions, cache_manager_from},
	key::{Hash, Key},
	mutation::{
		MutationContext, MutationContextParams, MutationOptions, MutationState,
		context::{
			DataFn as MutationDataFn, ErrorFn as MutationErrorFn, FilterFn as MutationFilterFn,
			MutationFn, RetryHandleFn as MutationRetryHandleFn, StateFn as MutationStateFn,
		},
	},
	pubsub::{Event, PubSub},
	query::{
		context::{
			DataFn, ErrorFn, ExecuteOptions, ExtractTtlFn, FilterFn, KeepCacheOnErrorFn, QueryContext,
			QueryContextParams, QueryFn, RetryHandleFn, StateFn,
		},
		engine::ExecuteOutcome,
		state::{CacheDirective, QuerySharedState, QueryState},
	},
	retry::RetryPolicy,
};

/// Everything needed to run one transient query through a [`Client`].
///
/// Analogous to [`QueryContextParams`] plus [`ExecuteOptions`] bundled
/// together, since a client-run query only ever lives for the one `execute`
/// call.
pub struct QueryRequest<T, E> {
	/// The query function itself.
	pub query_fn: QueryFn<T, E>,
	/// Placeholder data for `idle`/`loading` states before any data exists.
	pub placeholder: Option<T>,
	/// Cache directive; defaults to [`CacheDirective::Stale`].
	pub cache: Option<CacheDirective>,
	/// TTL override for any value this call ends up writing.
	pub ttl_ms: Option<Millis>,
	/// Cancellation token forwarded to `queryFn`.
	pub signal: Option<CancelToken>,
	/// Retry policy override; defaults to the client's configured policy.
	pub retry_policy: Option<Arc<dyn RetryPolicy<E>>>,
	/// Optional retry-notification hook.
	pub retry_handle_fn: Option<RetryHandleFn<E>>,
	/// Whether to keep a cached value after a failed refresh.
	pub keep_cache_on_error_fn: Option<KeepCacheOnErrorFn<E>>,
	/// TTL override hook.
	pub extract_ttl_fn: Option<ExtractTtlFn<T>>,
	/// Optional per-transition handler.
	pub state_fn: Option<StateFn<T, E>>,
	/// Optional data-only handler.
	pub data_fn: Option<DataFn<T>>,
	/// Optional error-only handler.
	pub error_fn: Option<ErrorFn<E>>,
	/// Gate applied before any bus event is applied.
	pub filter_fn: Option<FilterFn<T, E>>,
}
impl<T, E> QueryRequest<T, E> {
	/// Build a request with only a query function; every other knob takes
	/// the client's configured default.
	pub fn new(query_fn: QueryFn<T, E>) -> Self {
		Self {
			query_fn,
			placeholder: None,
			cache: None,
			ttl_ms: None,
			signal: None,
			retry_policy: None,
			retry_handle_fn: None,
			keep_cache_on_error_fn: None,
			extract_ttl_fn: None,
			state_fn: None,
			data_fn: None,
			error_fn: None,
			filter_fn: None,
		}
	}
}

/// Everything needed to run one transient mutation through a [`Client`].
pub struct MutationRequest<I, T, E> {
	/// The mutation function itself.
	pub mutation_fn: MutationFn<I, T, E>,
	/// Placeholder data for `idle`/`loading` states.
	pub placeholder: Option<T>,
	/// Cancellation token forwarded to `mutationFn`.
	pub signal: Option<CancelToken>,
	/// Retry policy override; defaults to the client's configured policy.
	pub retry_policy: Option<Arc<dyn RetryPolicy<E>>>,
	/// Optional retry-notification hook.
	pub retry_handle_fn: Option<MutationRetryHandleFn<E>>,
	/// Optional per-transition handler.
	pub state_fn: Option<MutationStateFn<T, E>>,
	/// Optional data-only handler.
	pub data_fn: Option<MutationDataFn<T, E>>,
	/// Optional error-only handler.
	pub error_fn: Option<MutationErrorFn<T, E>>,
	/// Gate applied before any transition is applied.
	pub filter_fn: Option<MutationFilterFn<T, E>>,
}
impl<I, T, E> MutationRequest<I, T, E> {
	/// Build a request with only a mutation function; every other knob
	/// takes the client's configured default.
	pub fn new(mutation_fn: MutationFn<I, T, E>) -> Self {
		Self {
			mutation_fn,
			placeholder: None,
			signal: None,
			retry_policy: None,
			retry_handle_fn: None,
			state_fn: None,
			data_fn: None,
			error_fn: None,
			filter_fn: None,
		}
	}
}

/// An active topic's key together with its hash, as returned by
/// [`Client::active_keys`].
#[derive(Clone, Debug)]
pub struct ActiveKey {
	/// The structured key bound to this topic, if the shared state has one.
	pub key: Key,
	/// The topic's hash.
	pub hash: Hash,
}

/// Orchestration layer composing transient query/mutation contexts over one
/// shared cache and bus.
///
/// Built with [`ClientBuilder`](super::ClientBuilder) or
/// [`Client::new`]; cheap to `Clone` (every field is `Arc`-backed), so it can
/// be handed out freely to call sites that each run their own one-shot
/// queries/mutations against the same shared cache.
pub struct Client<T, E> {
	pub(crate) bus: Arc<PubSub<QuerySharedState<T, E>, Event<T, E>>>,
	pub(crate) cache_manager: CacheManager<T, E>,
	pub(crate) options: ClientOptions<T, E>,
}
impl<T, E> Client<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	/// Build a client from `options`.
	pub fn new(options: ClientOptions<T, E>) -> Self {
		let bus = Arc::new(PubSub::new());
		let cache_manager = cache_manager_from(&options, bus.clone());

		Self { bus, cache_manager, options }
	}

	/// Start a [`ClientBuilder`](super::ClientBuilder).
	pub fn builder() -> super::ClientBuilder<T, E> {
		super::ClientBuilder::new()
	}

	fn build_query_context(&self, request: &QueryRequest<T, E>) -> Arc<QueryContext<T, E>> {
		QueryContext::new(QueryContextParams {
			placeholder: request.placeholder.clone(),
			cache: self.options.cache.clone(),
			bus: self.bus.clone(),
			retry_policy: request.retry_policy.clone().unwrap_or_else(|| self.options.retry_policy.clone()),
			default_ttl_ms: self.options.default_ttl_ms,
			fresh_ms: self.options.fresh_ms,
			hash_fn: self.options.hash_fn.clone(),
			query_fn: request.query_fn.clone(),
			retry_handle_fn: request.retry_handle_fn.clone(),
			keep_cache_on_error_fn: request.keep_cache_on_error_fn.clone(),
			extract_ttl_fn: request.extract_ttl_fn.clone(),
			state_fn: request.state_fn.clone(),
			data_fn: request.data_fn.clone(),
			error_fn: request.error_fn.clone(),
			filter_fn: request.filter_fn.clone(),
		})
	}

	/// Build a transient [`QueryContext`], run `execute`, and dispose of it
	/// once the returned state (and any background refresh it kicked off)
	/// has settled.
	pub async fn execute_query(&self, key: Key, request: QueryRequest<T, E>) -> ExecuteOutcome<T, E> {
		let ctx = self.build_query_context(&request);
		let opts = ExecuteOptions { cache: request.cache, ttl_ms: request.ttl_ms, signal: request.signal };
		let outcome = ctx.execute(key, opts).await;

		match &outcome.next {
			Some(promise) => {
				let ctx = ctx.clone();
				let promise = promise.clone();

				tokio::spawn(async move {
					let _ = promise.join().await;

					ctx.dispose().await;
				});
			},
			None => ctx.dispose().await,
		}

		outcome
	}

	/// Run a query ignoring the cache entirely (`cache: no-cache`),
	/// disposing of the transient context once it settles.
	pub async fn run_active_query(&self, key: Key, mut request: QueryRequest<T, E>) -> QueryState<T, E> {
		request.cache = Some(CacheDirective::NoCache);

		let ctx = self.build_query_context(&request);
		let opts = ExecuteOptions {
			cache: Some(CacheDirective::NoCache),
			ttl_ms: request.ttl_ms,
			signal: request.signal,
		};
		let outcome = ctx.execute(key, opts).await;

		ctx.dispose().await;

		outcome.state
	}

	/// Alias for [`Client::run_active_query`], matching the algorithm's name
	/// one layer down.
	pub async fn run_query(&self, key: Key, request: QueryRequest<T, E>) -> QueryState<T, E> {
		self.run_active_query(key, request).await
	}

	/// Build a transient [`MutationContext`] and run it to completion.
	pub async fn execute_mutation<I>(&self, input: I, request: MutationRequest<I, T, E>) -> MutationState<T, E>
	where
		I: Clone + Send + Sync + 'static,
	{
		let ctx = MutationContext::new(MutationContextParams {
			placeholder: request.placeholder,
			cache_manager: self.cache_manager.clone(),
			retry_policy: request.retry_policy.unwrap_or_else(|| self.options.retry_policy.clone()),
			mutation_fn: request.mutation_fn,
			retry_handle_fn: request.retry_handle_fn,
			state_fn: request.state_fn,
			data_fn: request.data_fn,
			error_fn: request.error_fn,
			filter_fn: request.filter_fn,
		});

		ctx.execute(input, MutationOptions { signal: request.signal }).await
	}

	/// Current value for `key`, if present and not expired.
	pub async fn get(&self, key: &Key) -> Option<T> {
		self.cache_manager.get(key).await
	}

	/// Write `data` for `key` directly, publishing a `mutation` event.
	pub async fn set(&self, key: &Key, data: T, ttl_ms: Option<Millis>) {
		self.cache_manager.set(key, data, ttl_ms).await;
	}

	/// Remove the entry for `key`, if present.
	pub async fn delete(&self, key: &Key) {
		self.cache_manager.delete(key).await;
	}

	/// Delete every entry under `key`'s hash prefix and publish an
	/// invalidation event.
	pub async fn invalidate(&self, key: &Key) {
		self.cache_manager.invalidate(key).await;
	}

	/// Remove every entry from the underlying store.
	pub async fn clear(&self) {
		self.cache_manager.clear().await;
	}

	/// Every currently active topic's key/hash pair.
	pub async fn active_keys(&self) -> Vec<ActiveKey> {
		self.bus
			.entries()
			.await
			.into_iter()
			.filter_map(|(hash, shared)| shared.key.map(|key| ActiveKey { key, hash }))
			.collect()
	}

	/// Current cache value for every active topic.
	pub async fn active_data(&self) -> Vec<(Key, Option<T>)> {
		let mut out = Vec::new();

		for active in self.active_keys().await {
			let data = self.options.cache.get(&active.hash).await;

			out.push((active.key, data));
		}

		out
	}

	/// Number of active topics whose in-flight promise is still pending.
	pub async fn loading(&self) -> usize {
		let mut count = 0;

		for shared in self.bus.states().await {
			if let Some(promise) = shared.promise {
				if promise.status().await == crate::query::promise::PromiseStatus::Pending {
					count += 1;
				}
			}
		}

		count
	}

	/// Await every currently pending promise across active topics; returns
	/// how many were awaited.
	pub async fn wait_all(&self) -> usize {
		let mut pending = Vec::new();

		for shared in self.bus.states().await {
			if let Some(promise) = shared.promise {
				if promise.status().await == crate::query::promise::PromiseStatus::Pending {
					pending.push(promise);
				}
			}
		}

		let count = pending.len();

		for promise in pending {
			let _ = promise.join().await;
		}

		count
	}
}
impl<T, E> Clone for Client<T, E> {
	fn clone(&self) -> Self {
		Self { bus: self.bus.clone(), cache_manager: self.cache_manager.clone(), options: self.options.clone() }
	}
}
