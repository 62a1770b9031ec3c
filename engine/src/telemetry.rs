// Telemetry module for structured logging and metric descriptions

use anyhow::Result;
use metrics::{describe_counter, describe_histogram};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging
///
/// Sets up the tracing subscriber with:
/// - Log level from configuration, overridden by `RUST_LOG`
/// - JSON formatting with span context when `json` is set, human output otherwise
/// - Output on stderr so command output on stdout stays machine readable
pub fn init_logging(log_level: &str, json: bool) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(log_level)?,
    };

    let layer = if json {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::debug!(log_level = log_level, json = json, "Logging initialized");
    Ok(())
}

/// Build a filter from a configured level or directive list
fn level_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(log_level)
        .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", log_level, e))
}

/// Describe the engine's metrics for whichever recorder the host installs
///
/// - console_round_trips_total: commands sent, by verb
/// - bvfs_fallbacks_total: listings retried against `path=@`
/// - catalog_listing_entries: rows returned per listing
/// - catalog_listing_failures_total: listings aborted
/// - job_resolution_failures_total: resolutions degraded to no jobs
/// - restore_submitted_total / restore_rejected_total: submission outcomes
pub fn describe_metrics() {
    describe_counter!(
        "console_round_trips_total",
        "Console commands sent to the director"
    );
    describe_counter!(
        "bvfs_fallbacks_total",
        "Listings retried against the last resolved path"
    );
    describe_histogram!(
        "catalog_listing_entries",
        "Number of entries returned by one listing"
    );
    describe_counter!(
        "catalog_listing_failures_total",
        "Listings aborted by transport or parse failures"
    );
    describe_counter!(
        "job_resolution_failures_total",
        "Job id resolutions that degraded to an empty set"
    );
    describe_counter!("restore_submitted_total", "Restore jobs accepted");
    describe_counter!("restore_rejected_total", "Restore submissions that failed");
}
