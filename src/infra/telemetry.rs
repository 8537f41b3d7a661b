use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::blog::METRIC_CONTENT_FETCH_ERROR;
use crate::cache::{METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED, METRIC_CACHE_MISS};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;
use super::sanity::METRIC_CONTENT_FETCH_MS;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT,
            Unit::Count,
            "Total number of content fetches served from the fetch cache."
        );
        describe_counter!(
            METRIC_CACHE_MISS,
            Unit::Count,
            "Total number of content fetches that went to the content store."
        );
        describe_counter!(
            METRIC_CACHE_EVICT,
            Unit::Count,
            "Total number of fetch cache evictions due to capacity."
        );
        describe_counter!(
            METRIC_CACHE_INVALIDATED,
            Unit::Count,
            "Total number of fetch cache entries dropped by tag revalidation."
        );
        describe_counter!(
            METRIC_CONTENT_FETCH_ERROR,
            Unit::Count,
            "Total number of content fetches that failed and fell back to an empty default."
        );
        describe_histogram!(
            METRIC_CONTENT_FETCH_MS,
            Unit::Milliseconds,
            "Content store round-trip latency in milliseconds."
        );
    });
}
