use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
};
use metrics_util::debugging::DebuggingRecorder;
use spaceproxy::application::{ProxyService, RetryPolicy, Upstream, UpstreamError};
use spaceproxy::cache::{CacheConfig, CacheKey, ResponseStore};
use spaceproxy::domain::{Endpoints, UpstreamRequest};
use spaceproxy::infra::http::{HttpState, RateLimiter, build_router};
use spaceproxy::infra::telemetry;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;
use url::Url;

struct FailingUpstream;

#[async_trait]
impl Upstream for FailingUpstream {
    async fn get(&self, _request: &UpstreamRequest) -> Result<Bytes, UpstreamError> {
        Err(UpstreamError::Timeout)
    }
}

#[tokio::test(start_paused = true)]
async fn proxy_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    // Cache hit/miss/expired/evict
    let store = ResponseStore::new(&CacheConfig {
        max_entries: 1,
        ..Default::default()
    });
    let first = CacheKey::compose("neo:id", &["1"]);
    let second = CacheKey::compose("neo:id", &["2"]);

    assert!(store.get(&first).is_none());
    store.insert(first.clone(), Bytes::from_static(b"{}"), Some(Duration::from_secs(5)));
    assert!(store.get(&first).is_some());
    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(store.get(&first).is_none());
    store.insert(first.clone(), Bytes::from_static(b"{}"), None);
    store.insert(second, Bytes::from_static(b"{}"), None);

    // Upstream attempts, retries and the final failure
    let endpoints = Endpoints {
        api_base: Url::parse("https://api.test").expect("url"),
        images_base: Url::parse("https://images.test").expect("url"),
        epic_archive_base: Url::parse("https://epic.test/archive").expect("url"),
        api_key: "TEST_KEY".to_string(),
    };
    let proxy = ProxyService::new(
        Arc::new(FailingUpstream),
        Arc::new(ResponseStore::new(&CacheConfig::default())),
        RetryPolicy::default(),
    );
    let router = build_router(
        HttpState {
            proxy,
            endpoints: Arc::new(endpoints),
            rate_limiter: Arc::new(RateLimiter::new(Duration::from_secs(60), 1)),
        },
        CorsLayer::new(),
    );

    let statuses = [
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::TOO_MANY_REQUESTS,
    ];
    for expected in statuses {
        let request = Request::get("/api/neo/3542519")
            .body(Body::empty())
            .expect("request");
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        assert_eq!(response.status(), expected);
    }

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "spaceproxy_cache_hit_total",
        "spaceproxy_cache_miss_total",
        "spaceproxy_cache_expired_total",
        "spaceproxy_cache_evict_total",
        "spaceproxy_upstream_attempt_total",
        "spaceproxy_upstream_retry_total",
        "spaceproxy_upstream_failure_total",
        "spaceproxy_rate_limited_total",
    ];

    for name in expected {
        assert!(names.contains(name), "missing metric {name}");
    }
}
