//! The mutation algorithms: `executeMutation`, `updateMutation`, and
//! `resetMutation`.
//!
//! Grounded on the same `execAsyncOperation` retry driver the query engine
//! uses, generalized from `runQuery`'s fetch-then-cache-write shape into a
//! bare fetch-then-settle shape: a mutation never reads or owns a cache
//! entry of its own, it only (optionally) drives writes through the handlers
//! it's given a [`CacheManager`] handle to.

// self
use crate::{
	clock::CancelToken,
	mutation::{
		context::{MutationContext, MutationOptions},
		state::MutationState,
	},
	query::state::ResetTarget,
};

impl<I, T, E> MutationContext<I, T, E>
where
	I: Clone + Send + Sync + 'static,
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
{
	/// Run `mutationFn` against `input` (through the retry driver), applying
	/// `loading` then the settled `success`/`error` transition. Never
	/// throws: the returned state always reflects the final condition.
	pub async fn execute(&self, input: I, opts: MutationOptions) -> MutationState<T, E> {
		let signal = opts.signal.unwrap_or_default();

		self.update(MutationState::Loading { data: None }).await;

		let state = self.run(input, signal).await;

		self.update(state.clone()).await;

		state
	}

	async fn run(&self, input: I, signal: CancelToken) -> MutationState<T, E> {
		let mutation_fn = self.mutation_fn.clone();
		let op_signal = signal.clone();
		let op = move || {
			let mutation_fn = mutation_fn.clone();
			let input = input.clone();
			let signal = op_signal.clone();

			async move { mutation_fn(input, signal).await }
		};

		let mut retry_handle = self.retry_handle_fn.clone().map(|f| {
			let f = f.clone();

			move |attempt: u32, err: &E| f(attempt, err)
		});
		let on_retry: Option<&mut dyn FnMut(u32, &E)> =
			retry_handle.as_mut().map(|f| f as &mut dyn FnMut(u32, &E));
		let result = crate::retry::exec_async_operation(op, self.retry_policy.as_ref(), on_retry).await;

		match result {
			Ok(data) => MutationState::Success { data },
			Err(error) => MutationState::Error { error },
		}
	}

	/// Apply `next` if `filterFn({current, next})` allows it, then invoke
	/// `dataFn`/`errorFn`/`stateFn` with a handle onto the shared
	/// [`crate::cache::CacheManager`] so handlers can drive cache
	/// writes/invalidation as a side effect.
	async fn update(&self, next: MutationState<T, E>) {
		let current = self.get_state().await;

		if !(self.filter_fn)(&current, &next) {
			return;
		}

		*self.state.write().await = next.clone();

		if let Some(data) = next.data() {
			if let Some(data_fn) = &self.data_fn {
				data_fn(data.clone(), self.cache_manager.clone()).await;
			}
		}

		if let Some(error) = next.error() {
			if let Some(error_fn) = &self.error_fn {
				error_fn(error.clone(), self.cache_manager.clone()).await;
			}
		}

		if let Some(state_fn) = &self.state_fn {
			state_fn(next, self.cache_manager.clone()).await;
		}
	}

	/// Reset local state to `idle{placeholder}`. `target: Handler` also
	/// invokes `stateFn` once more.
	pub async fn reset(&self, target: ResetTarget) {
		let state = MutationState::Idle { data: self.placeholder.clone() };

		*self.state.write().await = state.clone();

		if target == ResetTarget::Handler {
			if let Some(state_fn) = &self.state_fn {
				state_fn(state, self.cache_manager.clone()).await;
			}
		}
	}
}
