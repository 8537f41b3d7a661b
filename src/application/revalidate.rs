//! On-demand revalidation: webhook authentication and tag invalidation.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::application::repos::TagInvalidator;
use crate::cache::CacheTag;

const BEARER_PREFIX: &str = "Bearer ";

/// Outcome of checking a webhook's credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authorized,
    Unauthorized,
    /// No secret is configured server-side; nothing can be authorized.
    Misconfigured,
}

/// Check an `Authorization` header value against the configured secret.
///
/// Only `Bearer <secret>` is accepted. The comparison runs in constant time
/// over the secret bytes.
pub fn authenticate(header: Option<&str>, configured_secret: Option<&str>) -> AuthOutcome {
    let Some(secret) = configured_secret.filter(|secret| !secret.is_empty()) else {
        return AuthOutcome::Misconfigured;
    };
    let Some(presented) = header.and_then(|value| value.strip_prefix(BEARER_PREFIX)) else {
        return AuthOutcome::Unauthorized;
    };
    if bool::from(presented.as_bytes().ct_eq(secret.as_bytes())) {
        AuthOutcome::Authorized
    } else {
        AuthOutcome::Unauthorized
    }
}

/// Recover the affected post's slug from a webhook payload.
///
/// Looks at `slug`, `body.slug` and `document.slug` in that order. Each may be
/// a string or an object with a string `current`; the first non-empty string
/// wins.
pub fn extract_slug(payload: &Value) -> Option<String> {
    const LOCATIONS: [&[&str]; 3] = [&["slug"], &["body", "slug"], &["document", "slug"]];

    LOCATIONS.iter().find_map(|path| {
        let field = path
            .iter()
            .try_fold(payload, |value, segment| value.get(segment))?;
        let slug = match field {
            Value::String(slug) => slug.as_str(),
            Value::Object(object) => object.get("current")?.as_str()?,
            _ => return None,
        };
        (!slug.is_empty()).then(|| slug.to_string())
    })
}

/// Tags to invalidate for a webhook call, in response order.
pub fn tags_for(slug: Option<&str>) -> Vec<CacheTag> {
    let mut tags = vec![CacheTag::Posts, CacheTag::Categories];
    if let Some(slug) = slug {
        tags.push(CacheTag::post(slug));
    }
    tags
}

/// Response body of the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevalidateResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revalidated: Option<Vec<CacheTag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RevalidateResponse {
    pub fn revalidated(tags: Vec<CacheTag>) -> Self {
        Self {
            ok: true,
            revalidated: Some(tags),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            revalidated: None,
            message: Some(message.into()),
        }
    }
}

/// Result of one webhook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidateOutcome {
    Revalidated(Vec<CacheTag>),
    Unauthorized,
    Misconfigured,
    Disabled,
}

/// Whether the endpoint accepts calls at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidationMode {
    Disabled,
    Active { secret: Option<String> },
}

#[derive(Clone)]
pub struct RevalidationService {
    mode: RevalidationMode,
    invalidator: Arc<dyn TagInvalidator>,
}

impl RevalidationService {
    pub fn new(mode: RevalidationMode, invalidator: Arc<dyn TagInvalidator>) -> Self {
        Self { mode, invalidator }
    }

    /// Authenticate a call and, when authorized, invalidate the broad tags and
    /// the post tag recoverable from `payload`.
    pub fn handle(&self, authorization: Option<&str>, payload: Option<&Value>) -> RevalidateOutcome {
        let secret = match &self.mode {
            RevalidationMode::Disabled => return RevalidateOutcome::Disabled,
            RevalidationMode::Active { secret } => secret.as_deref(),
        };

        match authenticate(authorization, secret) {
            AuthOutcome::Authorized => {}
            AuthOutcome::Unauthorized => {
                warn!(
                    target = "application::revalidate",
                    "Rejected revalidation call with invalid credentials"
                );
                return RevalidateOutcome::Unauthorized;
            }
            AuthOutcome::Misconfigured => {
                warn!(
                    target = "application::revalidate",
                    "Revalidation call received but no secret is configured"
                );
                return RevalidateOutcome::Misconfigured;
            }
        }

        let slug = payload.and_then(extract_slug);
        let tags = tags_for(slug.as_deref());
        let dropped: usize = tags
            .iter()
            .map(|tag| self.invalidator.invalidate(tag))
            .sum();
        info!(
            target = "application::revalidate",
            slug = slug.as_deref().unwrap_or_default(),
            tags = ?tags.iter().map(ToString::to_string).collect::<Vec<_>>(),
            dropped,
            "Revalidated cache tags"
        );
        RevalidateOutcome::Revalidated(tags)
    }
}
