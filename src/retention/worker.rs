//! Periodic retention worker.
//!
//! Runs a fleet sweep at the configured interval until the cancellation
//! token fires. A failed run is logged and the next one starts on schedule.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::coordinator::FleetCoordinator;
use crate::config::RetentionConfig;

/// Starts the retention worker as a background task.
///
/// Returns when the token is cancelled. Cancellation is only observed between
/// runs, so an in-flight sweep always finishes its current batch.
pub async fn start_retention_worker(
    coordinator: Arc<FleetCoordinator>,
    config: RetentionConfig,
    cancel: CancellationToken,
) -> u64 {
    if !config.enabled {
        tracing::info!("Retention worker disabled by configuration");
        return 0;
    }

    let dry_run_msg = if config.safety.dry_run {
        " (DRY RUN)"
    } else {
        ""
    };

    tracing::info!(
        interval_secs = config.interval_secs,
        max_revisions_per_release = config.max_revisions_per_release,
        batch_size = config.batch_size,
        dry_run = config.safety.dry_run,
        "Starting retention worker{}",
        dry_run_msg
    );

    let interval = config.interval();
    let mut runs = 0u64;

    loop {
        match coordinator.run().await {
            Ok(summary) => {
                if summary.has_evictions() || summary.has_failures() {
                    tracing::info!(
                        clusters_swept = summary.clusters_swept,
                        clusters_failed = summary.clusters_failed,
                        revisions_deleted = summary.revisions_deleted,
                        revisions_skipped_dry_run = summary.revisions_skipped_dry_run,
                        dry_run = config.safety.dry_run,
                        "Retention run complete{}",
                        dry_run_msg
                    );
                } else {
                    tracing::debug!("Retention run complete, no revisions to evict");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error running retention");
            }
        }
        runs += 1;

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(runs, "Retention worker stopped");
                return runs;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
