//! `MutationContext`: everything needed to run one mutation — the
//! callbacks, the cache-manager handle, and the context's own current state.

// std
use std::{pin::Pin, sync::Arc};
// crates.io
use tokio::sync::RwLock;
// self
use crate::{
	cache::CacheManager,
	clock::CancelToken,
	mutation::state::MutationState,
	retry::RetryPolicy,
};

/// A boxed, `Send` future — the shape every user-supplied callback returns.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// `mutationFn(input, cancel) -> Future<T>`.
pub type MutationFn<I, T, E> = Arc<dyn Fn(I, CancelToken) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
/// Side-effect hook invoked once per retry, after the backoff sleep and
/// immediately before the next attempt.
pub type RetryHandleFn<E> = Arc<dyn Fn(u32, &E) + Send + Sync>;
/// Gate applied to the current/next state pair before a transition is
/// applied. Default: always `true`.
pub type FilterFn<T, E> = Arc<dyn Fn(&MutationState<T, E>, &MutationState<T, E>) -> bool + Send + Sync>;
/// Invoked after every transition, with the new state and a handle onto the
/// shared [`CacheManager`] so handlers can drive cache writes/invalidation
/// as a side effect of the mutation settling.
pub type StateFn<T, E> = Arc<dyn Fn(MutationState<T, E>, CacheManager<T, E>) -> BoxFuture<'static, ()> + Send + Sync>;
/// Invoked after a transition that carries data.
pub type DataFn<T, E> = Arc<dyn Fn(T, CacheManager<T, E>) -> BoxFuture<'static, ()> + Send + Sync>;
/// Invoked after a transition that carries an error.
pub type ErrorFn<T, E> = Arc<dyn Fn(E, CacheManager<T, E>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Cancellation options passed to `execute`.
#[derive(Clone, Default)]
pub struct MutationOptions {
	/// Cancellation token forwarded to `mutationFn`.
	pub signal: Option<CancelToken>,
}

/// All fields a [`MutationContext`] needs; handed to
/// [`MutationContext::new`] as one value so construction stays a single call
/// even with this many knobs.
pub struct MutationContextParams<I, T, E> {
	/// Placeholder data used for `idle` states (before any run, or after a
	/// context reset).
	pub placeholder: Option<T>,
	/// Handle onto the shared cache, exposed to handlers so `dataFn`/
	/// `errorFn`/`stateFn` can invalidate or write cache entries.
	pub cache_manager: CacheManager<T, E>,
	/// Retry policy applied to `mutationFn` invocations.
	pub retry_policy: Arc<dyn RetryPolicy<E>>,
	/// The mutation function itself.
	pub mutation_fn: MutationFn<I, T, E>,
	/// Optional retry-notification hook.
	pub retry_handle_fn: Option<RetryHandleFn<E>>,
	/// Optional per-transition handler.
	pub state_fn: Option<StateFn<T, E>>,
	/// Optional data-only handler.
	pub data_fn: Option<DataFn<T, E>>,
	/// Optional error-only handler.
	pub error_fn: Option<ErrorFn<T, E>>,
	/// Gate applied before any transition is applied. Default: always
	/// `true`.
	pub filter_fn: Option<FilterFn<T, E>>,
}

/// Everything needed to run one mutation: the callbacks, the cache-manager
/// handle, and the context's own current state.
///
/// Unlike [`crate::query::QueryContext`], a mutation context never
/// subscribes to the bus — it is a one-shot write, not a value other
/// contexts coalesce onto — so it needs no `Arc::new_cyclic` wiring and can
/// be constructed as a plain value.
pub struct MutationContext<I, T, E> {
	pub(crate) placeholder: Option<T>,
	pub(crate) cache_manager: CacheManager<T, E>,
	pub(crate) retry_policy: Arc<dyn RetryPolicy<E>>,
	pub(crate) mutation_fn: MutationFn<I, T, E>,
	pub(crate) retry_handle_fn: Option<RetryHandleFn<E>>,
	pub(crate) state_fn: Option<StateFn<T, E>>,
	pub(crate) data_fn: Option<DataFn<T, E>>,
	pub(crate) error_fn: Option<ErrorFn<T, E>>,
	pub(crate) filter_fn: FilterFn<T, E>,
	pub(crate) state: RwLock<MutationState<T, E>>,
}
impl<I, T, E> MutationContext<I, T, E>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	/// Build a new context from `params`.
	pub fn new(params: MutationContextParams<I, T, E>) -> Self {
		Self {
			state: RwLock::new(MutationState::Idle { data: params.placeholder.clone() }),
			placeholder: params.placeholder,
			cache_manager: params.cache_manager,
			retry_policy: params.retry_policy,
			mutation_fn: params.mutation_fn,
			retry_handle_fn: params.retry_handle_fn,
			state_fn: params.state_fn,
			data_fn: params.data_fn,
			error_fn: params.error_fn,
			filter_fn: params.filter_fn.unwrap_or_else(|| Arc::new(|_, _| true)),
		}
	}

	/// The context's current state.
	pub async fn get_state(&self) -> MutationState<T, E> {
		self.state.read().await.clone()
	}
}
