//! Async query/mutation state engine with staleness-aware caching, in-flight
//! de-duplication, retry with backoff, and prefix invalidation fan-out —
//! built for client-side Rust data layers.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod cache;
pub mod client;
pub mod clock;
pub mod defaults;
pub mod key;
pub mod mutation;
pub mod pubsub;
pub mod query;
pub mod retry;

mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

pub use crate::{
	client::{ActiveKey, Client, ClientBuilder, ClientOptions, DetachedClient, MutationRequest, QueryRequest},
	error::{Error, Result},
	key::{Hash, HashFn, Key, KeyPart},
	mutation::{MutationContext, MutationContextParams, MutationOptions, MutationState},
	query::{ExecuteOutcome, ObservablePromise, PromiseStatus, QueryContext, QueryContextParams, QueryState},
};

#[cfg(test)]
mod _test {
	use tracing_subscriber as _;
}
