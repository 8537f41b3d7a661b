//! HTTP adapter for the hosted content store's GROQ query API.

use std::time::Instant;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use metrics::histogram;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::application::queries::ContentQuery;
use crate::application::repos::{ContentStore, StoreError};
use crate::config::SanitySettings;

use super::error::InfraError;

pub(crate) const METRIC_CONTENT_FETCH_MS: &str = "blogfront_content_fetch_ms";

const API_HOST: &str = "api.sanity.io";
const CDN_HOST: &str = "apicdn.sanity.io";
const ERROR_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Described { description: String },
    Plain(String),
}

/// Runs [`ContentQuery`] plans against `https://<project>.api.sanity.io`.
#[derive(Clone, Debug)]
pub struct SanityStore {
    client: Client,
    endpoint: Url,
    token: Option<String>,
}

impl SanityStore {
    pub fn new(settings: &SanitySettings) -> Result<Self, InfraError> {
        let host = if settings.use_cdn { CDN_HOST } else { API_HOST };
        let endpoint = Url::parse(&format!(
            "https://{}.{host}/v{}/data/query/{}",
            settings.project_id, settings.api_version, settings.dataset
        ))
        .map_err(|err| InfraError::configuration(format!("invalid content store URL: {err}")))?;
        Self::with_endpoint(endpoint, settings)
    }

    /// Build a store that sends queries to `endpoint` instead of the hosted API.
    pub fn with_endpoint(endpoint: Url, settings: &SanitySettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("blogfront/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::content_store(format!("failed to build client: {err}")))?;
        Ok(Self {
            client,
            endpoint,
            token: settings.token.clone(),
        })
    }

    /// Query URL for a plan: the GROQ text under `query` and every parameter
    /// JSON-encoded under `$<name>`.
    pub fn query_url(&self, query: &ContentQuery) -> Url {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query.groq());
            for (name, value) in query.params() {
                pairs.append_pair(&format!("${name}"), &value.to_string());
            }
        }
        url
    }
}

#[async_trait]
impl ContentStore for SanityStore {
    async fn fetch(&self, query: &ContentQuery) -> Result<Value, StoreError> {
        let mut request = self.client.get(self.query_url(query));
        if let Some(token) = self.token.as_deref() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let started = Instant::now();
        let response = request.send().await.map_err(StoreError::transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(StoreError::transport)?;
        histogram!(METRIC_CONTENT_FETCH_MS, "query" => query.name())
            .record(started.elapsed().as_secs_f64() * 1000.0);

        if !status.is_success() {
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&bytes),
            });
        }

        let decoded: QueryResponse = serde_json::from_slice(&bytes).map_err(StoreError::decode)?;
        debug!(
            target = "infra::sanity",
            query = query.name(),
            status = status.as_u16(),
            "Fetched content"
        );
        Ok(decoded.result)
    }
}

fn upstream_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error: ErrorDetail::Described { description },
        }) => description,
        Ok(ErrorResponse {
            error: ErrorDetail::Plain(message),
        }) => message,
        Err(_) => String::from_utf8_lossy(body)
            .chars()
            .take(ERROR_SNIPPET_CHARS)
            .collect(),
    }
}
