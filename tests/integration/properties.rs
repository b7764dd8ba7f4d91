//! Cross-cutting invariants that aren't already pinned down by a unit test
//! closer to the code they exercise, checked here against the public
//! surface a caller actually uses.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use restate_engine::{
	cache::{CacheStore, PersistentStore, apply_patch},
	clock,
	client::{ClientBuilder, DetachedClient},
	key::default_hash_fn,
	pubsub::PubSub,
	query::{
		context::{ExecuteOptions, FilterFn, QueryContext, QueryContextParams},
		state::{QueryState, ResetTarget},
	},
	retry::NoRetryPolicy,
};
// self
use crate::support::str_key;

fn base_params(
	store: Arc<dyn CacheStore<String>>,
	bus: Arc<PubSub<restate_engine::query::state::QuerySharedState<String, String>, restate_engine::pubsub::Event<String, String>>>,
) -> QueryContextParams<String, String> {
	QueryContextParams {
		placeholder: Some("placeholder".to_string()),
		cache: store,
		bus,
		retry_policy: Arc::new(NoRetryPolicy),
		default_ttl_ms: 180_000,
		fresh_ms: 30_000,
		hash_fn: default_hash_fn(),
		query_fn: Arc::new(|_key, _signal| Box::pin(async { Ok("x".to_string()) })),
		retry_handle_fn: None,
		keep_cache_on_error_fn: None,
		extract_ttl_fn: None,
		state_fn: None,
		data_fn: None,
		error_fn: None,
		filter_fn: None,
	}
}

#[tokio::test]
async fn resetting_a_context_restores_the_placeholder_without_notifying_handlers() {
	let store: Arc<dyn CacheStore<String>> = Arc::new(PersistentStore::new());
	let bus = Arc::new(PubSub::new());
	let invocations = Arc::new(AtomicUsize::new(0));
	let mut params = base_params(store, bus);

	params.state_fn = Some({
		let invocations = invocations.clone();

		Arc::new(move |_state| {
			let invocations = invocations.clone();

			Box::pin(async move {
				invocations.fetch_add(1, Ordering::SeqCst);
			})
		})
	});

	let ctx = QueryContext::new(params);

	ctx.reset(ResetTarget::Context).await;

	let state = ctx.get_state().await;

	assert!(matches!(state, QueryState::Idle { data: Some(ref d) } if d == "placeholder"));
	assert_eq!(invocations.load(Ordering::SeqCst), 0, "a plain context reset must not invoke stateFn");

	ctx.reset(ResetTarget::Handler).await;

	assert_eq!(invocations.load(Ordering::SeqCst), 1, "target: Handler must invoke stateFn exactly once");
}

#[tokio::test]
async fn a_filter_that_always_rejects_leaves_state_and_handlers_untouched() {
	let store: Arc<dyn CacheStore<String>> = Arc::new(PersistentStore::new());
	let bus = Arc::new(PubSub::new());
	let data_calls = Arc::new(AtomicUsize::new(0));
	let mut params = base_params(store, bus);
	let filter_fn: FilterFn<String, String> = Arc::new(|_current, _event| false);

	params.filter_fn = Some(filter_fn);
	params.data_fn = Some({
		let data_calls = data_calls.clone();

		Arc::new(move |_data| {
			let data_calls = data_calls.clone();

			Box::pin(async move {
				data_calls.fetch_add(1, Ordering::SeqCst);
			})
		})
	});

	let ctx = QueryContext::new(params);
	let before = ctx.get_state().await;

	ctx.execute(str_key("k"), ExecuteOptions::default()).await;

	let after = ctx.get_state().await;

	assert!(matches!(before, QueryState::Idle { .. }));
	assert!(matches!(after, QueryState::Idle { .. }), "a rejecting filter must leave local state untouched");
	assert_eq!(data_calls.load(Ordering::SeqCst), 0, "dataFn must not run for a filtered-out transition");
}

#[tokio::test]
async fn a_detached_session_replays_its_writes_as_a_patch() {
	let shared_options = ClientBuilder::<String, String>::new().build().expect("default options validate");
	let detached = DetachedClient::new(&shared_options);

	let query_fn_a: restate_engine::query::context::QueryFn<String, String> =
		Arc::new(|_key, _signal| Box::pin(async { Ok("v1".to_string()) }));
	let query_fn_b: restate_engine::query::context::QueryFn<String, String> =
		Arc::new(|_key, _signal| Box::pin(async { Ok("v2".to_string()) }));

	let outcome_a = detached
		.execute_query(str_key("a"), restate_engine::client::QueryRequest::new(query_fn_a))
		.await;
	let outcome_b = detached
		.execute_query(str_key("b"), restate_engine::client::QueryRequest::new(query_fn_b))
		.await;

	assert_eq!(outcome_a.state.data(), Some(&"v1".to_string()));
	assert_eq!(outcome_b.state.data(), Some(&"v2".to_string()));

	let patch = detached.commit().await;

	assert_eq!(patch.len(), 2);

	let fresh: PersistentStore<String> = PersistentStore::new();

	apply_patch(&fresh, &patch, clock::now_ms()).await;

	for record in &patch {
		assert_eq!(fresh.get(&record.hash).await, Some(record.data.clone()));
	}
}
