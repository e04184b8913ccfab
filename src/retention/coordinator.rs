//! Fleet-wide fan-out over the cluster directory.
//!
//! Clusters are fetched one page at a time. Every cluster of a page is swept
//! in its own task; the next page is only requested once the whole batch has
//! finished, which bounds concurrency to the batch size.

use std::{sync::Arc, time::Instant};

use futures::future::join_all;
use tracing::Instrument;
use uuid::Uuid;

use super::{cluster_task::ClusterSweepTask, outcome::Summary};
use crate::{
    directory::{ClusterDirectory, ClusterFilter, DirectoryError},
    observability::metrics,
};

pub struct FleetCoordinator {
    directory: Arc<dyn ClusterDirectory>,
    task: Arc<ClusterSweepTask>,
    batch_size: u64,
    dry_run: bool,
}

impl FleetCoordinator {
    pub fn new(
        directory: Arc<dyn ClusterDirectory>,
        task: Arc<ClusterSweepTask>,
        batch_size: u64,
        dry_run: bool,
    ) -> Self {
        Self {
            directory,
            task,
            batch_size: batch_size.max(1),
            dry_run,
        }
    }

    /// Run one sweep over every monitored cluster.
    ///
    /// Only a directory failure aborts the run. Cluster failures, including a
    /// panicking cluster task, are counted in the summary.
    pub async fn run(&self) -> Result<Summary, DirectoryError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("retention_run", %run_id, dry_run = self.dry_run);
        let mut summary = self.sweep_fleet().instrument(span).await?;
        summary.run_id = run_id;
        Ok(summary)
    }

    async fn sweep_fleet(&self) -> Result<Summary, DirectoryError> {
        let started = Instant::now();
        let filter = ClusterFilter::retention_monitored();
        let mut summary = Summary::new(self.dry_run);
        let mut offset = 0u64;
        let mut batches = 0u64;

        loop {
            let page = self
                .directory
                .list_clusters(filter, offset, self.batch_size)
                .await?;
            if page.clusters.is_empty() {
                break;
            }

            let ids: Vec<u64> = page.clusters.iter().map(|c| c.id).collect();
            tracing::debug!(
                offset,
                clusters = ids.len(),
                total = page.total,
                "Sweeping cluster batch"
            );

            let handles: Vec<_> = page
                .clusters
                .into_iter()
                .map(|cluster| {
                    let task = Arc::clone(&self.task);
                    tokio::spawn(
                        async move { task.sweep_cluster(&cluster).await }.in_current_span(),
                    )
                })
                .collect();

            for (cluster_id, joined) in ids.iter().zip(join_all(handles).await) {
                match joined {
                    Ok(outcome) => {
                        metrics::record_cluster_sweep(if outcome.is_failed() {
                            "failed"
                        } else {
                            "done"
                        });
                        summary.merge_cluster(&outcome);
                    }
                    Err(e) => {
                        tracing::error!(
                            cluster_id,
                            error = %e,
                            "Cluster sweep task did not complete"
                        );
                        metrics::record_cluster_sweep("panicked");
                        summary.record_failed_cluster(*cluster_id);
                    }
                }
            }

            batches += 1;
            offset += ids.len() as u64;
            if offset >= page.total {
                break;
            }
        }

        summary.failed_cluster_ids.sort_unstable();
        summary.duration_ms = started.elapsed().as_millis() as u64;
        metrics::record_retention_run(&summary);

        tracing::info!(
            batches,
            clusters_swept = summary.clusters_swept,
            clusters_failed = summary.clusters_failed,
            releases_evicted = summary.releases_evicted,
            revisions_archived = summary.revisions_archived,
            revisions_deleted = summary.revisions_deleted,
            revisions_skipped_dry_run = summary.revisions_skipped_dry_run,
            duration_ms = summary.duration_ms,
            dry_run = self.dry_run,
            "Fleet sweep finished"
        );

        Ok(summary)
    }
}
