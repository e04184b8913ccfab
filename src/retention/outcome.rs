//! Per-unit results of a retention run.
//!
//! Every level of the sweep returns its own outcome and the level above
//! merges them; nothing is accumulated through shared state.

use serde::Serialize;
use uuid::Uuid;

/// Why a single evicted revision did not complete archive-then-delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RevisionFailure {
    /// Nothing was written and nothing was deleted.
    Serialize { version: u64, reason: String },
    /// The cold-store write failed; the revision was left in place.
    Archive {
        version: u64,
        key: String,
        reason: String,
    },
    /// The revision was archived but is still present in the live store.
    Delete {
        version: u64,
        key: String,
        reason: String,
    },
}

impl RevisionFailure {
    pub fn version(&self) -> u64 {
        match self {
            RevisionFailure::Serialize { version, .. }
            | RevisionFailure::Archive { version, .. }
            | RevisionFailure::Delete { version, .. } => *version,
        }
    }
}

/// Result of running archive-then-delete over one release's evicted set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub release: String,
    /// Versions written to cold storage.
    pub archived: Vec<u64>,
    /// Versions removed from the live store. Always a subset of `archived`.
    pub deleted: Vec<u64>,
    /// Versions that would have been evicted in dry-run mode.
    pub skipped_dry_run: Vec<u64>,
    pub failures: Vec<RevisionFailure>,
}

impl PipelineOutcome {
    pub fn new(release: impl Into<String>) -> Self {
        Self {
            release: release.into(),
            ..Default::default()
        }
    }

    pub fn failed_archival(&self) -> usize {
        self.count_failures(|f| matches!(f, RevisionFailure::Archive { .. }))
    }

    pub fn failed_deletion(&self) -> usize {
        self.count_failures(|f| matches!(f, RevisionFailure::Delete { .. }))
    }

    pub fn failed_serialization(&self) -> usize {
        self.count_failures(|f| matches!(f, RevisionFailure::Serialize { .. }))
    }

    fn count_failures(&self, pred: impl Fn(&RevisionFailure) -> bool) -> usize {
        self.failures.iter().filter(|f| pred(f)).count()
    }
}

/// A release whose history could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseFailure {
    pub release: String,
    pub reason: String,
}

/// Result of sweeping one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceOutcome {
    pub namespace: String,
    /// Set when the release listing itself failed; nothing else was attempted.
    pub list_error: Option<String>,
    pub releases_scanned: usize,
    /// One entry per release that exceeded the limit and went through the
    /// pipeline.
    pub pipelines: Vec<PipelineOutcome>,
    pub release_failures: Vec<ReleaseFailure>,
}

impl NamespaceOutcome {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.list_error.is_some()
    }
}

/// Lifecycle of a single cluster's sweep.
///
/// `Connecting -> Listing -> Sweeping -> Done`, with `Failed` reachable only
/// from `Connecting` or `Listing`. Once namespaces are being swept the cluster
/// always finishes; namespace failures are recorded as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterState {
    Connecting,
    Listing,
    Sweeping,
    Done,
    Failed,
}

impl ClusterState {
    pub fn can_transition_to(self, next: ClusterState) -> bool {
        matches!(
            (self, next),
            (ClusterState::Connecting, ClusterState::Listing)
                | (ClusterState::Connecting, ClusterState::Failed)
                | (ClusterState::Listing, ClusterState::Sweeping)
                | (ClusterState::Listing, ClusterState::Failed)
                | (ClusterState::Sweeping, ClusterState::Done)
        )
    }
}

/// Result of sweeping one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOutcome {
    pub cluster_id: u64,
    pub state: ClusterState,
    /// The state the cluster failed in, with the reason.
    pub failure: Option<(ClusterState, String)>,
    pub namespaces: Vec<NamespaceOutcome>,
}

impl ClusterOutcome {
    pub fn is_failed(&self) -> bool {
        self.state == ClusterState::Failed
    }
}

/// Aggregate result of one fleet-wide run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Correlates the summary with the run's log lines.
    pub run_id: Uuid,
    pub dry_run: bool,
    pub clusters_swept: u64,
    pub clusters_failed: u64,
    pub failed_cluster_ids: Vec<u64>,
    pub namespaces_failed: u64,
    /// Releases whose history could not be fetched.
    pub releases_failed: u64,
    /// Releases over the limit that went through archive-then-delete.
    pub releases_evicted: u64,
    pub revisions_archived: u64,
    pub revisions_deleted: u64,
    pub revisions_failed_archival: u64,
    pub revisions_failed_deletion: u64,
    pub revisions_failed_serialization: u64,
    pub revisions_skipped_dry_run: u64,
    pub duration_ms: u64,
}

impl Summary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Fold one cluster's outcome into the totals.
    pub fn merge_cluster(&mut self, outcome: &ClusterOutcome) {
        if outcome.is_failed() {
            self.record_failed_cluster(outcome.cluster_id);
            return;
        }
        self.clusters_swept += 1;

        for namespace in &outcome.namespaces {
            if namespace.is_failed() {
                self.namespaces_failed += 1;
            }
            self.releases_failed += namespace.release_failures.len() as u64;

            for pipeline in &namespace.pipelines {
                self.releases_evicted += 1;
                self.revisions_archived += pipeline.archived.len() as u64;
                self.revisions_deleted += pipeline.deleted.len() as u64;
                self.revisions_failed_archival += pipeline.failed_archival() as u64;
                self.revisions_failed_deletion += pipeline.failed_deletion() as u64;
                self.revisions_failed_serialization += pipeline.failed_serialization() as u64;
                self.revisions_skipped_dry_run += pipeline.skipped_dry_run.len() as u64;
            }
        }
    }

    /// Count a cluster that did not produce an outcome, or failed before sweeping.
    pub fn record_failed_cluster(&mut self, cluster_id: u64) {
        self.clusters_failed += 1;
        self.failed_cluster_ids.push(cluster_id);
    }

    pub fn has_evictions(&self) -> bool {
        self.revisions_deleted > 0 || self.revisions_skipped_dry_run > 0
    }

    pub fn has_failures(&self) -> bool {
        self.clusters_failed > 0
            || self.namespaces_failed > 0
            || self.releases_failed > 0
            || self.revisions_failed_archival > 0
            || self.revisions_failed_deletion > 0
            || self.revisions_failed_serialization > 0
    }
}
