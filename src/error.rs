//! Crate-wide error types and `Result` alias.

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the engine itself.
///
/// This is deliberately narrow: failures originating from user-supplied
/// `queryFn`/`mutationFn` callbacks are never wrapped here — they flow through
/// the generic `E` parameter of [`crate::query::QueryState`] and
/// [`crate::mutation::MutationState`] instead, and are swallowed at the
/// engine boundary per the error-handling design (cache I/O failures become
/// misses, handler failures are logged and dropped). `Error` only represents
/// conditions the engine itself cannot route around: right now, that's
/// rejecting a malformed [`ClientOptions`](crate::client::ClientOptions) at
/// [`ClientBuilder::build`](crate::client::ClientBuilder::build) time.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
