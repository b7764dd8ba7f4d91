//! `QueryContext`: everything needed to run one query — the callbacks, the
//! cache/bus handles, and the context's own current state.

// std
use std::{pin::Pin, sync::Arc};
// crates.io
use tokio::sync::RwLock;
// self
use crate::{
	cache::CacheStore,
	clock::{CancelToken, Millis},
	key::{HashFn, Key},
	pubsub::{Event, PubSub, SubscriberHandle},
	query::state::{CacheDirective, QueryState, QuerySharedState},
	retry::RetryPolicy,
};

/// A boxed, `Send` future — the shape every user-supplied callback returns.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// `queryFn(key, cancel) -> Future<T>`.
pub type QueryFn<T, E> = Arc<dyn Fn(Key, CancelToken) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
/// Side-effect hook invoked once per retry, after the backoff sleep and
/// immediately before the next attempt.
pub type RetryHandleFn<E> = Arc<dyn Fn(u32, &E) + Send + Sync>;
/// Whether a cached value should survive a failed refresh. Default: `false`.
pub type KeepCacheOnErrorFn<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
/// Derives the TTL to store a fresh value under. Default: returns the
/// fallback unchanged.
pub type ExtractTtlFn<T> = Arc<dyn Fn(&T, Millis) -> Millis + Send + Sync>;
/// Gate applied to every incoming bus event before it is applied to local
/// state. Default: always `true`.
pub type FilterFn<T, E> = Arc<dyn Fn(&QueryState<T, E>, &Event<T, E>) -> bool + Send + Sync>;
/// Invoked after every transition, with the new state.
pub type StateFn<T, E> = Arc<dyn Fn(QueryState<T, E>) -> BoxFuture<'static, ()> + Send + Sync>;
/// Invoked after a transition that carries data.
pub type DataFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;
/// Invoked after a transition that carries an error.
pub type ErrorFn<E> = Arc<dyn Fn(E) -> BoxFuture<'static, ()> + Send + Sync>;

/// Cache consultation and cancellation options passed to `execute`.
#[derive(Clone, Default)]
pub struct ExecuteOptions {
	/// Cache directive; defaults to [`CacheDirective::Stale`].
	pub cache: Option<CacheDirective>,
	/// TTL override for any value this call ends up writing.
	pub ttl_ms: Option<Millis>,
	/// Cancellation token forwarded to `queryFn`.
	pub signal: Option<CancelToken>,
}

/// All fields a [`QueryContext`] needs; handed to
/// [`QueryContext::new`] as one value so construction stays a single call
/// even with this many knobs.
pub struct QueryContextParams<T, E> {
	/// Placeholder data used for `idle` states (before any fetch, or after
	/// a context reset).
	pub placeholder: Option<T>,
	/// The store this context reads/writes directly (shared with the
	/// owning cache manager).
	pub cache: Arc<dyn CacheStore<T>>,
	/// The bus this context coalesces and publishes transitions on.
	pub bus: Arc<PubSub<QuerySharedState<T, E>, Event<T, E>>>,
	/// Retry policy applied to `queryFn` invocations.
	pub retry_policy: Arc<dyn RetryPolicy<E>>,
	/// TTL applied to successful writes when `extract_ttl_fn`/`execute`'s
	/// `ttl_ms` don't override it.
	pub default_ttl_ms: Millis,
	/// Age, in milliseconds, below which a cached entry is considered
	/// fresh rather than stale.
	pub fresh_ms: Millis,
	/// Maps a [`Key`] to its [`crate::key::Hash`].
	pub hash_fn: HashFn,
	/// The query function itself.
	pub query_fn: QueryFn<T, E>,
	/// Optional retry-notification hook.
	pub retry_handle_fn: Option<RetryHandleFn<E>>,
	/// Whether to keep a cached value after a failed refresh. Default:
	/// always `false`.
	pub keep_cache_on_error_fn: Option<KeepCacheOnErrorFn<E>>,
	/// TTL override hook. Default: returns the fallback unchanged.
	pub extract_ttl_fn: Option<ExtractTtlFn<T>>,
	/// Optional per-transition handler.
	pub state_fn: Option<StateFn<T, E>>,
	/// Optional data-only handler.
	pub data_fn: Option<DataFn<T>>,
	/// Optional error-only handler.
	pub error_fn: Option<ErrorFn<E>>,
	/// Gate applied before any bus event is applied. Default: always
	/// `true`.
	pub filter_fn: Option<FilterFn<T, E>>,
}

/// Everything needed to run one query: the callbacks, the cache/bus handles,
/// and the context's own current state.
///
/// Instances are always held as `Arc<QueryContext<T, E>>` — the bus listener
/// registered on construction needs to call back into the very context that
/// registered it, which [`QueryContext::new`] wires up via
/// [`Arc::new_cyclic`].
pub struct QueryContext<T, E> {
	pub(crate) placeholder: Option<T>,
	pub(crate) cache: Arc<dyn CacheStore<T>>,
	pub(crate) bus: Arc<PubSub<QuerySharedState<T, E>, Event<T, E>>>,
	pub(crate) subscriber: SubscriberHandle<QuerySharedState<T, E>, Event<T, E>>,
	pub(crate) retry_policy: Arc<dyn RetryPolicy<E>>,
	pub(crate) default_ttl_ms: Millis,
	pub(crate) fresh_ms: Millis,
	pub(crate) hash_fn: HashFn,
	pub(crate) query_fn: QueryFn<T, E>,
	pub(crate) retry_handle_fn: Option<RetryHandleFn<E>>,
	pub(crate) keep_cache_on_error_fn: KeepCacheOnErrorFn<E>,
	pub(crate) extract_ttl_fn: ExtractTtlFn<T>,
	pub(crate) state_fn: Option<StateFn<T, E>>,
	pub(crate) data_fn: Option<DataFn<T>>,
	pub(crate) error_fn: Option<ErrorFn<E>>,
	pub(crate) filter_fn: FilterFn<T, E>,
	pub(crate) state: RwLock<QueryState<T, E>>,
}
impl<T, E> QueryContext<T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	/// Build a new context from `params`, wiring its bus listener to call
	/// back into the returned `Arc`.
	pub fn new(params: QueryContextParams<T, E>) -> Arc<Self> {
		Arc::new_cyclic(|weak| {
			let weak_ctx = weak.clone();
			let listener = Arc::new(move |event: Event<T, E>| -> BoxFuture<'static, ()> {
				let weak_ctx = weak_ctx.clone();

				Box::pin(async move {
					if let Some(ctx) = weak_ctx.upgrade() {
						ctx.update_query(event).await;
					}
				})
			});

			Self {
				placeholder: params.placeholder.clone(),
				cache: params.cache,
				bus: params.bus.clone(),
				subscriber: SubscriberHandle::new(params.bus, listener),
				retry_policy: params.retry_policy,
				default_ttl_ms: params.default_ttl_ms,
				fresh_ms: params.fresh_ms,
				hash_fn: params.hash_fn,
				query_fn: params.query_fn,
				retry_handle_fn: params.retry_handle_fn,
				keep_cache_on_error_fn: params
					.keep_cache_on_error_fn
					.unwrap_or_else(|| Arc::new(|_: &E| false)),
				extract_ttl_fn: params
					.extract_ttl_fn
					.unwrap_or_else(|| Arc::new(|_: &T, fallback: Millis| fallback)),
				state_fn: params.state_fn,
				data_fn: params.data_fn,
				error_fn: params.error_fn,
				filter_fn: params.filter_fn.unwrap_or_else(|| Arc::new(|_, _| true)),
				state: RwLock::new(QueryState::Idle { data: params.placeholder }),
			}
		})
	}

	/// The context's current state.
	pub async fn get_state(&self) -> QueryState<T, E> {
		self.state.read().await.clone()
	}
}
