use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, RawQuery, State},
    http::{StatusCode, Uri},
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::application::{
    blog::BlogService, error::HttpError, pagination::ListingParams,
    revalidate::RevalidationService,
};

use super::{
    middleware::{access_log, log_responses, security_headers, set_request_context},
    revalidate::revalidate,
};

const LEGACY_POST_PREFIX: &str = "/hello-sanity";
const POST_PREFIX: &str = "/blog";

#[derive(Clone)]
pub struct HttpState {
    pub blog: Arc<BlogService>,
    pub revalidation: Arc<RevalidationService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/blog", get(listing))
        .route("/blog/{slug}", get(post_detail))
        .route("/hello-sanity/{slug}", get(legacy_post_redirect))
        .route("/revalidate", post(revalidate))
        .route("/api/revalidate", post(revalidate))
        .route("/_health", get(health))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(access_log))
        .layer(middleware::from_fn(set_request_context))
}

async fn listing(State(state): State<HttpState>, RawQuery(query): RawQuery) -> Response {
    let params = ListingParams::from_query(query.as_deref());
    Json(state.blog.listing(&params).await).into_response()
}

async fn post_detail(State(state): State<HttpState>, Path(slug): Path<String>) -> Response {
    match state.blog.post_page(&slug).await {
        Ok(page) => Json(page).into_response(),
        Err(err) => HttpError::from(err).into_response(),
    }
}

/// `/hello-sanity/<slug>` moved to `/blog/<slug>` for good.
async fn legacy_post_redirect(uri: Uri) -> Redirect {
    let rest = uri
        .path()
        .strip_prefix(LEGACY_POST_PREFIX)
        .unwrap_or(uri.path());
    let target = match uri.query() {
        Some(query) => format!("{POST_PREFIX}{rest}?{query}"),
        None => format!("{POST_PREFIX}{rest}"),
    };
    Redirect::permanent(&target)
}

async fn not_found(uri: Uri) -> HttpError {
    HttpError::new(
        "infra::http::not_found",
        StatusCode::NOT_FOUND,
        "Not found",
        format!("no route for {}", uri.path()),
    )
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
