//! The mutation state tagged union — mirrors [`crate::query::state::QueryState`]
//! minus the `stale` variant, which has no meaning for a one-shot write.

/// Tagged union of the four states a mutation can be in.
#[derive(Clone, Debug)]
pub enum MutationState<T, E> {
	/// No mutation has run yet (or the context was reset).
	Idle {
		/// Placeholder or previously-known data, if any.
		data: Option<T>,
	},
	/// `mutationFn` is in flight.
	Loading {
		/// Last known data, retained while the mutation runs.
		data: Option<T>,
	},
	/// The most recent mutation succeeded.
	Success {
		/// The successful value.
		data: T,
	},
	/// The most recent mutation failed.
	Error {
		/// The error produced by `mutationFn` or the retry policy.
		error: E,
	},
}
impl<T, E> MutationState<T, E> {
	/// Construct the idle state with no placeholder data.
	pub fn idle() -> Self {
		MutationState::Idle { data: None }
	}

	/// The data carried by this state, if any.
	pub fn data(&self) -> Option<&T> {
		match self {
			MutationState::Idle { data } | MutationState::Loading { data } => data.as_ref(),
			MutationState::Success { data } => Some(data),
			MutationState::Error { .. } => None,
		}
	}

	/// The error carried by this state, if any.
	pub fn error(&self) -> Option<&E> {
		match self {
			MutationState::Error { error } => Some(error),
			_ => None,
		}
	}

	/// Whether this is the `Loading` variant.
	pub fn is_loading(&self) -> bool {
		matches!(self, MutationState::Loading { .. })
	}

	/// Whether this is the `Success` variant.
	pub fn is_success(&self) -> bool {
		matches!(self, MutationState::Success { .. })
	}
}
