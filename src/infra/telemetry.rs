use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

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

/// Register descriptions for every metric the proxy emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "spaceproxy_cache_hit_total",
            Unit::Count,
            "Responses served from the cache."
        );
        describe_counter!(
            "spaceproxy_cache_miss_total",
            Unit::Count,
            "Cache lookups that found no live entry."
        );
        describe_counter!(
            "spaceproxy_cache_expired_total",
            Unit::Count,
            "Entries dropped because their TTL elapsed."
        );
        describe_counter!(
            "spaceproxy_cache_evict_total",
            Unit::Count,
            "Entries evicted due to capacity."
        );
        describe_counter!(
            "spaceproxy_upstream_attempt_total",
            Unit::Count,
            "Upstream request attempts, retries included."
        );
        describe_counter!(
            "spaceproxy_upstream_retry_total",
            Unit::Count,
            "Upstream attempts that failed and were retried."
        );
        describe_counter!(
            "spaceproxy_upstream_failure_total",
            Unit::Count,
            "Upstream requests that failed after exhausting retries."
        );
        describe_counter!(
            "spaceproxy_rate_limited_total",
            Unit::Count,
            "Inbound requests rejected by the rate limiter."
        );
    });
}
