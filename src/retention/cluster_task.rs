use std::sync::Arc;

use tracing::{Instrument, info, info_span, warn};

use super::{
    outcome::{ClusterOutcome, ClusterState},
    sweeper::ReleaseSweeper,
};
use crate::{cluster::ClusterConnector, models::ClusterRef};

/// Sweeps every namespace of a single cluster.
pub struct ClusterSweepTask {
    connector: Arc<dyn ClusterConnector>,
    sweeper: Arc<ReleaseSweeper>,
}

/// Tracks a cluster through its sweep, refusing illegal transitions.
struct Progress {
    cluster_id: u64,
    state: ClusterState,
}

impl Progress {
    fn advance(&mut self, next: ClusterState) {
        if self.state.can_transition_to(next) {
            self.state = next;
        } else {
            warn!(
                cluster_id = self.cluster_id,
                from = ?self.state,
                to = ?next,
                "Ignoring invalid cluster state transition"
            );
        }
    }

    fn fail(mut self, reason: String) -> ClusterOutcome {
        let failed_in = self.state;
        self.advance(ClusterState::Failed);
        ClusterOutcome {
            cluster_id: self.cluster_id,
            state: self.state,
            failure: Some((failed_in, reason)),
            namespaces: Vec::new(),
        }
    }
}

impl ClusterSweepTask {
    pub fn new(connector: Arc<dyn ClusterConnector>, sweeper: Arc<ReleaseSweeper>) -> Self {
        Self { connector, sweeper }
    }

    /// Connect, list namespaces, then sweep them one after another.
    ///
    /// A connect or namespace-list failure fails the cluster before any
    /// revision is touched. Failures inside a namespace never fail the cluster.
    pub async fn sweep_cluster(&self, cluster: &ClusterRef) -> ClusterOutcome {
        let span = info_span!(
            "cluster_sweep",
            cluster_id = cluster.id,
            project_id = cluster.project_id,
            cluster = %cluster.name
        );
        self.sweep(cluster).instrument(span).await
    }

    async fn sweep(&self, cluster: &ClusterRef) -> ClusterOutcome {
        let mut progress = Progress {
            cluster_id: cluster.id,
            state: ClusterState::Connecting,
        };

        let handle = match self.connector.connect(cluster).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Failed to connect to cluster");
                return progress.fail(e.to_string());
            }
        };
        progress.advance(ClusterState::Listing);

        let namespaces = match handle.list_namespaces().await {
            Ok(namespaces) => namespaces,
            Err(e) => {
                warn!(error = %e, "Failed to list namespaces");
                return progress.fail(e.to_string());
            }
        };
        progress.advance(ClusterState::Sweeping);

        let mut outcomes = Vec::with_capacity(namespaces.len());
        for namespace in &namespaces {
            let outcome = self
                .sweeper
                .sweep_namespace(handle.as_ref(), cluster, namespace)
                .await;
            outcomes.push(outcome);
        }
        progress.advance(ClusterState::Done);

        let deleted: usize = outcomes
            .iter()
            .flat_map(|ns| &ns.pipelines)
            .map(|p| p.deleted.len())
            .sum();
        info!(
            namespaces = outcomes.len(),
            revisions_deleted = deleted,
            "Cluster sweep complete"
        );

        ClusterOutcome {
            cluster_id: cluster.id,
            state: progress.state,
            failure: None,
            namespaces: outcomes,
        }
    }
}
