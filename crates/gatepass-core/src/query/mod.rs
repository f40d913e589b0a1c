//! Data-fetch primitives used by every screen.
//!
//! A [`Query`] is a keyed read whose last successful result lives in the
//! shared [`QueryCache`]. A [`Mutation`] is a write that is never cached but
//! can mark queries stale once it succeeds.
//!
//! Overlapping requests are not de-duplicated. Each one applies its result
//! when it completes, so the response that resolves last is the one that
//! stays cached.

mod cache;

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use cache::{CacheEntry, QueryCache, QueryKey};

use crate::api::{ApiClient, ApiError, ApiResult, Envelope};

/// Snapshot of a query as a screen renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub is_pending: bool,
    pub error: Option<ApiError>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_pending: false,
            error: None,
        }
    }
}

/// Entry point for queries and mutations sharing one cache.
#[derive(Clone)]
pub struct QueryClient {
    api: ApiClient,
    cache: QueryCache,
}

impl QueryClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: QueryCache::new(),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Builds a query without fetching. State is seeded from the cache.
    pub fn query<T>(&self, key: impl Into<QueryKey>, endpoint: impl Into<String>) -> Query<T>
    where
        T: DeserializeOwned + Clone,
    {
        Query::new(
            self.api.clone(),
            self.cache.clone(),
            key.into(),
            endpoint.into(),
        )
    }

    /// Builds a query and performs its initial fetch.
    ///
    /// A failed initial fetch is recorded in the query's `error`; the query
    /// is returned either way so the caller can render or refetch.
    pub async fn use_get<T>(&self, key: impl Into<QueryKey>, endpoint: impl Into<String>) -> Query<T>
    where
        T: DeserializeOwned + Clone,
    {
        let query = self.query(key, endpoint);
        if let Err(e) = query.refetch().await {
            tracing::debug!(key = %query.key(), kind = %e.kind, "initial fetch failed");
        }
        query
    }

    /// POST mutation with a JSON body.
    pub fn use_post<B, T>(&self, endpoint: impl Into<String>) -> Mutation<B, T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        Mutation::new(self.api.clone(), self.cache.clone(), Method::POST, endpoint.into())
    }

    /// DELETE mutation. The payload is ignored; pass `&()`.
    pub fn use_delete<T>(&self, endpoint: impl Into<String>) -> Mutation<(), T>
    where
        T: DeserializeOwned,
    {
        Mutation::new(self.api.clone(), self.cache.clone(), Method::DELETE, endpoint.into())
    }

    /// Marks every cached query under `prefix` stale.
    pub fn invalidate(&self, prefix: impl Into<QueryKey>) -> usize {
        self.cache.invalidate_prefix(&prefix.into())
    }
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decrements the in-flight counter even if the request future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A keyed read request.
///
/// Clones share state, so a clone handed to a spawned task updates the same
/// query the screen is reading.
pub struct Query<T> {
    api: ApiClient,
    cache: QueryCache,
    key: QueryKey,
    endpoint: String,
    shared: Arc<QueryShared<T>>,
}

struct QueryShared<T> {
    data: Mutex<Option<T>>,
    error: Mutex<Option<ApiError>>,
    in_flight: AtomicUsize,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            cache: self.cache.clone(),
            key: self.key.clone(),
            endpoint: self.endpoint.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Query<T>
where
    T: DeserializeOwned + Clone,
{
    fn new(api: ApiClient, cache: QueryCache, key: QueryKey, endpoint: String) -> Self {
        let seeded = cache
            .get(&key)
            .and_then(|entry| match serde_json::from_value::<T>(entry.value) {
                Ok(data) => Some(data),
                Err(e) => {
                    tracing::debug!(%key, "cached value does not fit query type: {e}");
                    None
                }
            });

        Self {
            api,
            cache,
            key,
            endpoint,
            shared: Arc::new(QueryShared {
                data: Mutex::new(seeded),
                error: Mutex::new(None),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> QueryState<T> {
        QueryState {
            data: self.data(),
            is_pending: self.is_pending(),
            error: self.error(),
        }
    }

    pub fn data(&self) -> Option<T> {
        lock(&self.shared.data).clone()
    }

    pub fn is_pending(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn error(&self) -> Option<ApiError> {
        lock(&self.shared.error).clone()
    }

    /// Whether the cache entry behind this query has been invalidated.
    pub fn is_stale(&self) -> bool {
        self.cache.get(&self.key).is_some_and(|entry| entry.stale)
    }

    /// Re-issues the read and applies the outcome when it resolves.
    ///
    /// On success the cache and `data` are replaced together and `error` is
    /// cleared. On failure `data` keeps the previous value and `error` is set.
    pub async fn refetch(&self) -> ApiResult<T> {
        let _guard = InFlight::start(&self.shared.in_flight);

        match self.fetch().await {
            Ok((data, raw)) => {
                // Cache and `data` must move as one, or overlapping refetches
                // could leave them holding different responses.
                let mut slot = lock(&self.shared.data);
                self.cache.set(self.key.clone(), raw);
                *slot = Some(data.clone());
                *lock(&self.shared.error) = None;
                Ok(data)
            }
            Err(e) => {
                *lock(&self.shared.error) = Some(e.clone());
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> ApiResult<(T, Value)> {
        let envelope: Envelope<Value> = self.api.get(&self.endpoint).await?;
        let data = serde_json::from_value::<T>(envelope.data.clone()).map_err(|e| {
            ApiError::parse(format!("Unexpected data for {}: {e}", self.key))
        })?;
        Ok((data, envelope.data))
    }
}

/// A write request. Never cached.
pub struct Mutation<B: ?Sized, T> {
    api: ApiClient,
    cache: QueryCache,
    method: Method,
    endpoint: String,
    invalidates: Vec<QueryKey>,
    in_flight: Arc<AtomicUsize>,
    error: Arc<Mutex<Option<ApiError>>>,
    _types: PhantomData<fn(&B) -> T>,
}

impl<B, T> Mutation<B, T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    fn new(api: ApiClient, cache: QueryCache, method: Method, endpoint: String) -> Self {
        Self {
            api,
            cache,
            method,
            endpoint,
            invalidates: Vec::new(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            error: Arc::new(Mutex::new(None)),
            _types: PhantomData,
        }
    }

    /// Marks queries under `key` stale after each successful call.
    #[must_use]
    pub fn invalidates(mut self, key: impl Into<QueryKey>) -> Self {
        self.invalidates.push(key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Error of the most recently completed call, if it failed.
    pub fn error(&self) -> Option<ApiError> {
        lock(&self.error).clone()
    }

    pub fn reset(&self) {
        *lock(&self.error) = None;
    }

    /// Issues the request. Each call is independent of earlier ones.
    pub async fn mutate_async(&self, payload: &B) -> ApiResult<Envelope<T>> {
        let _guard = InFlight::start(&self.in_flight);
        let body = (self.method != Method::DELETE).then_some(payload);
        let result = self
            .api
            .send_json::<B, T>(self.method.clone(), &self.endpoint, body)
            .await;

        match &result {
            Ok(_) => {
                *lock(&self.error) = None;
                for key in &self.invalidates {
                    let touched = self.cache.invalidate_prefix(key);
                    tracing::debug!(%key, touched, "invalidated after mutation");
                }
            }
            Err(e) => *lock(&self.error) = Some(e.clone()),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;
    use crate::api::{ApiErrorKind, Pipeline};
    use crate::models::Stat;

    fn client_for(server: &MockServer) -> QueryClient {
        let api = ApiClient::with_pipeline(server.uri(), Duration::from_secs(5), Pipeline::new())
            .unwrap();
        QueryClient::new(api)
    }

    #[tokio::test]
    async fn test_use_get_fetches_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/access-codes/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"active_codes": 3, "monthly_visitors": 12, "activities": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let query = client.use_get::<Stat>("stats", "access-codes/stats").await;

        let state = query.state();
        assert!(!state.is_pending);
        assert!(state.error.is_none());
        assert_eq!(state.data.unwrap().active_codes, 3);

        let entry = client.cache().get(&QueryKey::from("stats")).unwrap();
        assert_eq!(entry.value["monthly_visitors"], json!(12));
    }

    #[tokio::test]
    async fn test_new_query_is_seeded_from_cache() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        client
            .cache()
            .set(QueryKey::from("stats"), json!({"active_codes": 9}));

        let query = client.query::<Stat>("stats", "access-codes/stats");
        assert_eq!(query.data().unwrap().active_codes, 9);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"active_codes": 1}})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let query = client.use_get::<Stat>("stats", "access-codes/stats").await;
        assert_eq!(query.data().unwrap().active_codes, 1);

        let err = query.refetch().await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Server);
        assert_eq!(query.error().unwrap().kind, ApiErrorKind::Server);
        assert_eq!(query.data().unwrap().active_codes, 1);
    }

    #[tokio::test]
    async fn test_concurrent_refetch_later_completion_wins() {
        let server = MockServer::start().await;
        // First request issued resolves last.
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"active_codes": 1}}))
                    .set_delay(Duration::from_millis(300)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"active_codes": 2}}))
                    .set_delay(Duration::from_millis(20)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let query = client.query::<Stat>("stats", "access-codes/stats");

        let slow = tokio::spawn({
            let query = query.clone();
            async move { query.refetch().await }
        });
        // Make sure the slow request reaches the server first.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let fast = query.refetch().await.unwrap();
        assert_eq!(fast.active_codes, 2);
        assert!(query.is_pending());

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow.active_codes, 1);
        assert!(!query.is_pending());

        assert_eq!(query.data().unwrap().active_codes, 1);
        let entry = client.cache().get(&QueryKey::from("stats")).unwrap();
        assert_eq!(entry.value["active_codes"], json!(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_refetches_leave_cache_and_data_in_agreement() {
        let server = MockServer::start().await;
        let served = Arc::new(AtomicU64::new(0));
        Mock::given(method("GET"))
            .respond_with({
                let served = Arc::clone(&served);
                move |_: &Request| {
                    let n = served.fetch_add(1, Ordering::SeqCst) + 1;
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"data": {"active_codes": n}}))
                        .set_delay(Duration::from_millis((n % 4) * 5))
                }
            })
            .mount(&server)
            .await;

        let client = client_for(&server);
        let query = client.query::<Stat>("stats", "access-codes/stats");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let query = query.clone();
                tokio::spawn(async move { query.refetch().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let data = query.data().unwrap();
        let cached: Stat =
            serde_json::from_value(client.cache().get(&QueryKey::from("stats")).unwrap().value)
                .unwrap();
        assert_eq!(cached, data);
        assert!(!query.is_pending());
    }

    #[tokio::test]
    async fn test_mutation_invalidates_registered_keys() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/access-codes"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"code": "AB12CD", "visitor_name": "Jane"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.cache().set(QueryKey::from("access-codes"), json!([]));
        client.cache().set(QueryKey::from("stats"), json!({}));
        client.cache().set(QueryKey::from("user"), json!({}));

        let mutation = client
            .use_post::<Value, Value>("access-codes")
            .invalidates("access-codes")
            .invalidates("stats");
        let envelope = mutation
            .mutate_async(&json!({"visitor_name": "Jane"}))
            .await
            .unwrap();

        assert_eq!(envelope.data["code"], json!("AB12CD"));
        assert!(!mutation.is_pending());
        assert!(client.cache().get(&QueryKey::from("access-codes")).unwrap().stale);
        assert!(client.cache().get(&QueryKey::from("stats")).unwrap().stale);
        assert!(!client.cache().get(&QueryKey::from("user")).unwrap().stale);
    }

    #[tokio::test]
    async fn test_failed_mutation_records_error_and_skips_invalidation() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"message": "Code already revoked"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.cache().set(QueryKey::from("access-codes"), json!([]));

        let mutation = client
            .use_delete::<Option<Value>>("access-codes/AB12CD")
            .invalidates("access-codes");
        let err = mutation.mutate_async(&()).await.unwrap_err();

        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert_eq!(mutation.error().unwrap().message, "Code already revoked");
        assert!(!client.cache().get(&QueryKey::from("access-codes")).unwrap().stale);

        mutation.reset();
        assert!(mutation.error().is_none());
    }
}
