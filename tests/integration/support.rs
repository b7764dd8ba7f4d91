//! Helpers shared by the scenario and property tests: building keys and
//! counting, in-process stand-ins for `queryFn`/`mutationFn`.

#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use restate_engine::{Key, KeyPart};

pub fn key(parts: &[KeyPart]) -> Key {
	parts.to_vec()
}

pub fn str_key(id: &str) -> Key {
	vec![KeyPart::from(id)]
}

/// A query function that counts its own invocations and always succeeds,
/// deriving its value from the call count.
pub fn counting_success_query_fn(
	calls: Arc<AtomicUsize>,
	value: impl Fn(usize) -> String + Send + Sync + 'static,
) -> restate_engine::query::context::QueryFn<String, String> {
	Arc::new(move |_key, _signal| {
		let calls = calls.clone();
		let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
		let data = value(n);

		Box::pin(async move { Ok(data) })
	})
}
