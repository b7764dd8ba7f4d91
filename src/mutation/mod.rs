//! The mutation state machine: a one-shot write against `mutationFn`, with
//! handlers free to drive cache invalidation/writes as a side effect.

pub mod context;
pub mod engine;
pub mod state;

pub use context::{MutationContext, MutationContextParams, MutationOptions};
pub use state::MutationState;
