use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use blogfront::{
    application::{
        blog::BlogService,
        queries::ContentQuery,
        repos::{ContentStore, StoreError},
        revalidate::{RevalidationMode, RevalidationService},
    },
    cache::{CacheConfig, CachedContentStore},
    domain::categories::CategoryOrdering,
    infra::http::{HttpState, build_router},
};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Serves one post and counts reads per query name.
#[derive(Default)]
struct CountingStore {
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl CountingStore {
    fn calls(&self, name: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .get(name)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ContentStore for CountingStore {
    async fn fetch(&self, query: &ContentQuery) -> Result<Value, StoreError> {
        *self
            .calls
            .lock()
            .expect("calls lock")
            .entry(query.name())
            .or_default() += 1;

        let post = json!({
            "_id": "post-a",
            "title": "A",
            "slug": { "current": "a" },
            "publishedAt": "2024-05-01T00:00:00Z",
            "tags": ["tax"],
            "categories": []
        });
        Ok(match query.name() {
            "post_list" => json!([post]),
            "post_count" => json!(1),
            "post_detail" => post,
            _ => json!([]),
        })
    }
}

fn app(mode: RevalidationMode) -> (Arc<CountingStore>, Router) {
    let store = Arc::new(CountingStore::default());
    let cache = Arc::new(CachedContentStore::new(
        store.clone(),
        &CacheConfig::default(),
    ));
    let blog = BlogService::new(cache.clone(), CategoryOrdering::default(), chrono_tz::UTC);
    let revalidation = RevalidationService::new(mode, cache);
    let router = build_router(HttpState {
        blog: Arc::new(blog),
        revalidation: Arc::new(revalidation),
    });
    (store, router)
}

fn active(secret: Option<&str>) -> RevalidationMode {
    RevalidationMode::Active {
        secret: secret.map(str::to_string),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn webhook(uri: &str, authorization: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn listing() -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/blog")
        .body(Body::empty())
        .expect("request should build")
}

#[tokio::test]
async fn authorized_webhook_drops_cached_listing() {
    let (store, app) = app(active(Some("s3cret")));

    send(&app, listing()).await;
    send(&app, listing()).await;
    assert_eq!(store.calls("post_list"), 1);

    let (status, body) = send(
        &app,
        webhook(
            "/api/revalidate",
            Some("Bearer s3cret"),
            r#"{"_type":"post","slug":{"current":"a"}}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "ok": true, "revalidated": ["posts", "categories", "post:a"] })
    );

    send(&app, listing()).await;
    assert_eq!(store.calls("post_list"), 2);
    assert_eq!(store.calls("categories"), 2);
}

#[tokio::test]
async fn both_webhook_paths_accept_calls_without_body() {
    let (_, app) = app(active(Some("s3cret")));
    for uri in ["/revalidate", "/api/revalidate"] {
        let (status, body) = send(&app, webhook(uri, Some("Bearer s3cret"), "")).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["revalidated"], json!(["posts", "categories"]), "{uri}");
    }
}

#[tokio::test]
async fn non_json_body_only_triggers_broad_tags() {
    let (_, app) = app(active(Some("s3cret")));
    let (status, body) = send(
        &app,
        webhook("/api/revalidate", Some("Bearer s3cret"), "slug=a"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revalidated"], json!(["posts", "categories"]));
}

#[tokio::test]
async fn wrong_or_missing_credentials_are_rejected_without_invalidating() {
    let (store, app) = app(active(Some("s3cret")));
    send(&app, listing()).await;

    for authorization in [None, Some("Bearer nope"), Some("s3cret"), Some("bearer s3cret")] {
        let (status, body) = send(
            &app,
            webhook("/api/revalidate", authorization, r#"{"slug":"a"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "ok": false, "message": "Unauthorized" }));
    }

    let (status, _) = send(
        &app,
        webhook("/api/revalidate?secret=s3cret", None, r#"{"slug":"a"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    send(&app, listing()).await;
    assert_eq!(store.calls("post_list"), 1);
}

#[tokio::test]
async fn missing_secret_is_a_server_error() {
    let (_, app) = app(active(None));
    let (status, body) = send(
        &app,
        webhook("/api/revalidate", Some("Bearer anything"), "{}"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["ok"], false);
    assert_eq!(body["message"], "revalidation secret not set");
}

#[tokio::test]
async fn disabled_endpoint_rejects_everything() {
    let (_, app) = app(RevalidationMode::Disabled);
    let (status, body) = send(
        &app,
        webhook("/api/revalidate", Some("Bearer s3cret"), "{}"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn webhook_requires_post() {
    let (_, app) = app(active(Some("s3cret")));
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/revalidate")
        .body(Body::empty())
        .expect("request should build");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
