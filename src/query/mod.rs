//! The query state machine: cache-aware, coalescing, bus-connected fetches.

pub mod context;
pub mod engine;
pub mod promise;
pub mod state;

pub use context::{QueryContext, QueryContextParams};
pub use engine::ExecuteOutcome;
pub use promise::{ObservablePromise, PromiseStatus};
pub use state::QueryState;
