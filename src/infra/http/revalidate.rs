use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::application::{
    error::ErrorReport,
    revalidate::{RevalidateOutcome, RevalidateResponse},
};

use super::public::HttpState;

const SOURCE: &str = "infra::http::revalidate";

/// Webhook endpoint. The body is optional and read leniently: anything that
/// is not JSON only triggers the broad tags.
pub async fn revalidate(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let payload = serde_json::from_slice::<Value>(&body).ok();

    match state
        .revalidation
        .handle(authorization, payload.as_ref())
    {
        RevalidateOutcome::Revalidated(tags) => {
            (StatusCode::OK, Json(RevalidateResponse::revalidated(tags))).into_response()
        }
        RevalidateOutcome::Unauthorized => rejection(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "missing or mismatched bearer secret",
        ),
        RevalidateOutcome::Misconfigured => rejection(
            StatusCode::INTERNAL_SERVER_ERROR,
            "revalidation secret not set",
            "revalidation secret not set",
        ),
        RevalidateOutcome::Disabled => rejection(
            StatusCode::SERVICE_UNAVAILABLE,
            "revalidation disabled",
            "revalidation endpoint is disabled",
        ),
    }
}

fn rejection(status: StatusCode, message: &'static str, detail: &'static str) -> Response {
    let mut response = (status, Json(RevalidateResponse::rejected(message))).into_response();
    ErrorReport::from_message(SOURCE, status, detail).attach(&mut response);
    response
}
