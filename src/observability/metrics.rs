//! Prometheus metrics for the retention job.
//!
//! Provides metrics for:
//! - Per-revision archive, delete and failure counts
//! - Per-cluster sweep results
//! - Run totals and duration

#[cfg(feature = "prometheus")]
use metrics::{counter, gauge, histogram};
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

use crate::{config::MetricsConfig, retention::Summary};

/// Initialize the metrics system and start the scrape endpoint.
///
/// Must be called from within a Tokio runtime.
#[cfg(feature = "prometheus")]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(config.listen_address)
        .set_buckets_for_metric(
            Matcher::Suffix("_duration_seconds".to_string()),
            &config.duration_buckets_secs,
        )
        .map_err(|e| MetricsError::Setup(e.to_string()))?
        .install()?;

    tracing::info!(address = %config.listen_address, "Prometheus exporter listening");
    Ok(())
}

/// Initialize the metrics system (no-op without prometheus feature).
#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if config.enabled {
        tracing::warn!("Metrics enabled but the 'prometheus' feature is not compiled in");
    }
    Ok(())
}

/// Record a revision written to cold storage.
pub fn record_revision_archived(backend: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "revision_reaper_revisions_archived_total",
            "backend" => backend.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = backend;
    }
}

/// Record a revision removed from a cluster's release store.
pub fn record_revision_deleted() {
    #[cfg(feature = "prometheus")]
    {
        counter!("revision_reaper_revisions_deleted_total").increment(1);
    }
}

/// Record a revision that did not complete archive-then-delete.
///
/// # Arguments
/// * `stage` - Where it stopped: "serialize", "archive" or "delete"
pub fn record_revision_failure(stage: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "revision_reaper_revision_failures_total",
            "stage" => stage.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = stage;
    }
}

/// Record the end state of one cluster's sweep ("done", "failed" or "panicked").
pub fn record_cluster_sweep(result: &str) {
    #[cfg(feature = "prometheus")]
    {
        counter!(
            "revision_reaper_cluster_sweeps_total",
            "result" => result.to_string()
        )
        .increment(1);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = result;
    }
}

/// Record the totals of a finished run.
pub fn record_retention_run(summary: &Summary) {
    #[cfg(feature = "prometheus")]
    {
        let mode = if summary.dry_run { "dry_run" } else { "live" };
        counter!("revision_reaper_runs_total", "mode" => mode).increment(1);
        histogram!("revision_reaper_run_duration_seconds", "mode" => mode)
            .record(summary.duration_ms as f64 / 1000.0);
        gauge!("revision_reaper_last_run_clusters_swept").set(summary.clusters_swept as f64);
        gauge!("revision_reaper_last_run_clusters_failed").set(summary.clusters_failed as f64);
        gauge!("revision_reaper_last_run_releases_evicted").set(summary.releases_evicted as f64);
        gauge!("revision_reaper_last_run_timestamp_seconds")
            .set(chrono::Utc::now().timestamp() as f64);
    }
    #[cfg(not(feature = "prometheus"))]
    {
        let _ = summary;
    }
}

/// Metrics initialization errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to set up metrics: {0}")]
    Setup(String),

    #[cfg(feature = "prometheus")]
    #[error("Failed to install metrics exporter: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}
