//! End-to-end scenarios: one test per documented interaction between the
//! cache, the query/mutation engines, and the bus.

// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use restate_engine::{
	cache::{ApproxLruStore, CacheManager, CacheStore, PersistentStore},
	client::{Client, ClientBuilder, ClientOptions, QueryRequest},
	key::default_hash_fn,
	mutation::{MutationContext, MutationContextParams, MutationOptions},
	query::{
		context::{ExecuteOptions, KeepCacheOnErrorFn, QueryContext, QueryContextParams},
		state::QueryState,
	},
	retry::{BasicRetryPolicy, JitterExponentialBackoffTimer, JitterStrategy, NoRetryPolicy, RetryPolicy},
};
use tokio::sync::Mutex as AsyncMutex;
// self
use crate::support::str_key;

#[tokio::test]
async fn cache_miss_then_hit_serves_from_cache_without_refetching() {
	let calls = Arc::new(AtomicUsize::new(0));
	let query_fn = crate::support::counting_success_query_fn(calls.clone(), |n| format!("U#{n}"));
	let options = ClientBuilder::<String, String>::new()
		.cache(Arc::new(ApproxLruStore::new(100, 60_000)))
		.fresh_ms(30_000)
		.default_ttl_ms(180_000)
		.build()
		.expect("fresh_ms below default_ttl_ms validates");
	let client = Client::new(options);
	let key = str_key("u1");

	let first = client.execute_query(key.clone(), QueryRequest::new(query_fn.clone())).await;

	assert_eq!(first.state.data(), Some(&"U#1".to_string()));
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	let second = client.execute_query(key.clone(), QueryRequest::new(query_fn)).await;

	assert_eq!(second.state.data(), Some(&"U#1".to_string()));
	assert!(matches!(second.state, QueryState::Success { .. }));
	assert_eq!(calls.load(Ordering::SeqCst), 1, "second call must not invoke queryFn again");
}

#[tokio::test]
async fn stale_entry_is_served_immediately_while_a_background_refresh_settles() {
	let calls = Arc::new(AtomicUsize::new(0));
	let query_fn = crate::support::counting_success_query_fn(calls.clone(), |n| format!("U#{n}"));
	let options = ClientBuilder::<String, String>::new()
		.cache(Arc::new(ApproxLruStore::new(100, 60_000)))
		.fresh_ms(50)
		.default_ttl_ms(180_000)
		.build()
		.expect("fresh_ms below default_ttl_ms validates");
	let client = Client::new(options);
	let key = str_key("u1");

	let first = client.execute_query(key.clone(), QueryRequest::new(query_fn.clone())).await;

	assert_eq!(first.state.data(), Some(&"U#1".to_string()));
	assert_eq!(calls.load(Ordering::SeqCst), 1);

	tokio::time::sleep(Duration::from_millis(100)).await;

	let second = client.execute_query(key.clone(), QueryRequest::new(query_fn)).await;

	assert!(matches!(second.state, QueryState::Stale { .. }));
	assert_eq!(second.state.data(), Some(&"U#1".to_string()));

	let next = second.next.expect("a stale hit must kick off a background refresh");
	let settled = next.join().await.expect("background refresh never rejects");

	assert_eq!(settled.data(), Some(&"U#1".to_string()));
	assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_attempts_are_retried_until_the_third_succeeds() {
	let calls = Arc::new(AtomicUsize::new(0));
	let query_fn: restate_engine::query::context::QueryFn<String, String> = Arc::new({
		let calls = calls.clone();

		move |_key, _signal| {
			let calls = calls.clone();

			Box::pin(async move {
				let attempt = calls.fetch_add(1, Ordering::SeqCst);

				if attempt < 2 { Err("boom".to_string()) } else { Ok("OK".to_string()) }
			})
		}
	});
	let retries_seen = Arc::new(AtomicUsize::new(0));
	let retry_handle_fn: restate_engine::query::context::RetryHandleFn<String> = Arc::new({
		let retries_seen = retries_seen.clone();

		move |_attempt, _err| {
			retries_seen.fetch_add(1, Ordering::SeqCst);
		}
	});
	let retry_policy: Arc<dyn RetryPolicy<String>> =
		Arc::new(BasicRetryPolicy::new(3, JitterExponentialBackoffTimer::with_strategy(0, 0, JitterStrategy::None)));
	let client = Client::new(
		ClientBuilder::<String, String>::new()
			.retry_policy(retry_policy)
			.build()
			.expect("default options with an overridden retry_policy validate"),
	);

	let mut request = QueryRequest::new(query_fn);
	request.cache = Some(restate_engine::query::state::CacheDirective::NoCache);
	request.retry_handle_fn = Some(retry_handle_fn);

	let outcome = client.execute_query(str_key("k"), request).await;

	assert_eq!(outcome.state.data(), Some(&"OK".to_string()));
	assert_eq!(calls.load(Ordering::SeqCst), 3);
	assert_eq!(retries_seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn a_failed_refresh_keeps_the_cached_value_only_when_the_handler_says_so() {
	let client = Client::new(ClientOptions::<String, String>::default());
	let key = str_key("k");

	client.set(&key, "V".to_string(), None).await;

	let error_message = Arc::new(AsyncMutex::new("keep".to_string()));
	let query_fn: restate_engine::query::context::QueryFn<String, String> = Arc::new({
		let error_message = error_message.clone();

		move |_key, _signal| {
			let error_message = error_message.clone();

			Box::pin(async move { Err(error_message.lock().await.clone()) })
		}
	});
	let keep_fn: KeepCacheOnErrorFn<String> = Arc::new(|e: &String| e == "keep");

	let mut first_request = QueryRequest::new(query_fn.clone());

	first_request.cache = Some(restate_engine::query::state::CacheDirective::NoCache);
	first_request.keep_cache_on_error_fn = Some(keep_fn.clone());
	first_request.retry_policy = Some(Arc::new(NoRetryPolicy));

	let first = client.execute_query(key.clone(), first_request).await;

	assert!(matches!(first.state, QueryState::Error { .. }));
	assert_eq!(client.get(&key).await, Some("V".to_string()));

	*error_message.lock().await = "drop".to_string();

	let mut second_request = QueryRequest::new(query_fn);

	second_request.cache = Some(restate_engine::query::state::CacheDirective::NoCache);
	second_request.keep_cache_on_error_fn = Some(keep_fn);
	second_request.retry_policy = Some(Arc::new(NoRetryPolicy));

	let second = client.execute_query(key.clone(), second_request).await;

	assert!(matches!(second.state, QueryState::Error { .. }));
	assert_eq!(client.get(&key).await, None);
}

/// Two contexts subscribed on `["account", "user", 1]` observe an
/// invalidation published against the shorter prefix key `["account"]` and
/// each end up enqueueing (or coalescing onto) exactly one background
/// refetch — the literal scenario documented as S5: the hashing scheme is
/// prefix-preserving, so `CacheManager::invalidate` fans the event out to
/// every active topic whose hash extends the invalidated one.
#[tokio::test]
async fn invalidation_triggers_a_background_refetch_for_every_subscribed_context() {
	let bus: Arc<restate_engine::pubsub::PubSub<_, _>> = Arc::new(restate_engine::pubsub::PubSub::new());
	let store: Arc<dyn CacheStore<String>> = Arc::new(PersistentStore::new());
	let cache_manager: CacheManager<String, String> =
		CacheManager::new(store.clone(), default_hash_fn(), 180_000).with_bus(bus.clone());
	let calls = Arc::new(AtomicUsize::new(0));
	let query_fn: restate_engine::query::context::QueryFn<String, String> = Arc::new({
		let calls = calls.clone();

		move |_key, _signal| {
			let calls = calls.clone();

			Box::pin(async move {
				calls.fetch_add(1, Ordering::SeqCst);

				tokio::time::sleep(Duration::from_millis(20)).await;

				Ok("v".to_string())
			})
		}
	});

	let make_ctx = || {
		QueryContext::new(QueryContextParams {
			placeholder: None,
			cache: store.clone(),
			bus: bus.clone(),
			retry_policy: Arc::new(NoRetryPolicy),
			default_ttl_ms: 180_000,
			fresh_ms: 30_000,
			hash_fn: default_hash_fn(),
			query_fn: query_fn.clone(),
			retry_handle_fn: None,
			keep_cache_on_error_fn: None,
			extract_ttl_fn: None,
			state_fn: None,
			data_fn: None,
			error_fn: None,
			filter_fn: None,
		})
	};
	let ctx_a = make_ctx();
	let ctx_b = make_ctx();
	let key: restate_engine::Key = vec!["account".into(), "user".into(), restate_engine::KeyPart::I64(1)];
	let invalidate_key = str_key("account");

	ctx_a.execute(key.clone(), ExecuteOptions::default()).await;
	ctx_b.execute(key.clone(), ExecuteOptions::default()).await;

	assert_eq!(calls.load(Ordering::SeqCst), 1, "second bind should read the freshly-cached value");

	let mutation_ctx = MutationContext::new(MutationContextParams {
		placeholder: None,
		cache_manager: cache_manager.clone(),
		retry_policy: Arc::new(NoRetryPolicy),
		mutation_fn: Arc::new(|input: String, _signal| Box::pin(async move { Ok(input) })),
		retry_handle_fn: None,
		state_fn: None,
		data_fn: Some({
			let invalidate_key = invalidate_key.clone();
			let data_fn: restate_engine::mutation::context::DataFn<String, String> =
				Arc::new(move |_data: String, cache_manager: CacheManager<String, String>| {
					let invalidate_key = invalidate_key.clone();

					Box::pin(async move { cache_manager.invalidate(&invalidate_key).await })
				});

			data_fn
		}),
		error_fn: None,
		filter_fn: None,
	});

	mutation_ctx.execute("ignored".to_string(), MutationOptions::default()).await;

	tokio::time::sleep(Duration::from_millis(50)).await;

	assert_eq!(calls.load(Ordering::SeqCst), 2, "invalidation must coalesce onto a single shared refetch");

	ctx_a.dispose().await;
	ctx_b.dispose().await;
}

#[tokio::test]
async fn contexts_staggered_by_a_millisecond_coalesce_onto_the_same_fetch() {
	let bus: Arc<restate_engine::pubsub::PubSub<_, _>> = Arc::new(restate_engine::pubsub::PubSub::new());
	let store: Arc<dyn CacheStore<String>> = Arc::new(PersistentStore::new());
	let calls = Arc::new(AtomicUsize::new(0));
	let query_fn: restate_engine::query::context::QueryFn<String, String> = Arc::new({
		let calls = calls.clone();

		move |_key, _signal| {
			let calls = calls.clone();

			Box::pin(async move {
				calls.fetch_add(1, Ordering::SeqCst);

				tokio::time::sleep(Duration::from_millis(100)).await;

				Ok("V".to_string())
			})
		}
	});

	let log_a = Arc::new(AsyncMutex::new(Vec::new()));
	let log_b = Arc::new(AsyncMutex::new(Vec::new()));

	fn state_fn_for(
		log: Arc<AsyncMutex<Vec<QueryState<String, String>>>>,
	) -> restate_engine::query::context::StateFn<String, String> {
		Arc::new(move |state| {
			let log = log.clone();

			Box::pin(async move { log.lock().await.push(state) })
		})
	}

	let make_ctx = |log: Arc<AsyncMutex<Vec<QueryState<String, String>>>>| {
		QueryContext::new(QueryContextParams {
			placeholder: None,
			cache: store.clone(),
			bus: bus.clone(),
			retry_policy: Arc::new(NoRetryPolicy),
			default_ttl_ms: 180_000,
			fresh_ms: 30_000,
			hash_fn: default_hash_fn(),
			query_fn: query_fn.clone(),
			retry_handle_fn: None,
			keep_cache_on_error_fn: None,
			extract_ttl_fn: None,
			state_fn: Some(state_fn_for(log)),
			data_fn: None,
			error_fn: None,
			filter_fn: None,
		})
	};
	let ctx_a = make_ctx(log_a.clone());
	let ctx_b = make_ctx(log_b.clone());
	let key = str_key("shared");

	let ctx_a_spawned = ctx_a.clone();
	let key_a = key.clone();
	let task_a = tokio::spawn(async move { ctx_a_spawned.execute(key_a, ExecuteOptions::default()).await });

	tokio::time::sleep(Duration::from_millis(1)).await;

	let outcome_b = ctx_b.execute(key.clone(), ExecuteOptions::default()).await;
	let outcome_a = task_a.await.expect("task_a must not panic");

	assert_eq!(calls.load(Ordering::SeqCst), 1, "queryFn must be invoked exactly once");
	assert_eq!(outcome_a.state.data(), Some(&"V".to_string()));
	assert_eq!(outcome_b.state.data(), Some(&"V".to_string()));

	let final_log_a = log_a.lock().await.clone();
	let final_log_b = log_b.lock().await.clone();

	assert_eq!(final_log_a.len(), 2, "ctx_a: loading then success");
	assert!(final_log_a[0].is_loading());
	assert!(final_log_a[1].is_success());

	assert_eq!(final_log_b.len(), 2, "ctx_b: loading (self) then success (via bus)");
	assert!(final_log_b[0].is_loading());
	assert!(final_log_b[1].is_success());

	ctx_a.dispose().await;
	ctx_b.dispose().await;
}
