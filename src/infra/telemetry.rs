use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber writing to stderr.
///
/// `RUST_LOG` directives take precedence over the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
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

/// Register descriptions for every metric the sync layer emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "careboard_cache_hit_total",
            Unit::Count,
            "Reads served from a fresh cache entry."
        );
        describe_counter!(
            "careboard_cache_miss_total",
            Unit::Count,
            "Reads that started a network fetch."
        );
        describe_counter!(
            "careboard_cache_dedup_join_total",
            Unit::Count,
            "Reads that joined a fetch already in flight."
        );
        describe_histogram!(
            "careboard_cache_fetch_ms",
            Unit::Milliseconds,
            "Cache fetch latency in milliseconds."
        );
        describe_counter!(
            "careboard_transport_requests_total",
            Unit::Count,
            "Outbound API requests by outcome."
        );
        describe_counter!(
            "careboard_mutation_total",
            Unit::Count,
            "Mutations by outcome."
        );
        describe_counter!(
            "careboard_mutation_rollback_total",
            Unit::Count,
            "Optimistic patches reverted after a failed mutation."
        );
        describe_counter!(
            "careboard_session_expired_total",
            Unit::Count,
            "Sessions latched expired by an HTTP 401."
        );
    });
}
