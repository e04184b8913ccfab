use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    outcome::{NamespaceOutcome, ReleaseFailure},
    pipeline::ArchiveThenDeletePipeline,
    policy::RevisionEvictionPolicy,
};
use crate::{
    cluster::ReleaseStoreHandle,
    models::{ClusterRef, NamespaceRef, ReleaseStatus},
};

/// Applies the eviction policy to every release in a namespace.
pub struct ReleaseSweeper {
    policy: RevisionEvictionPolicy,
    pipeline: Arc<ArchiveThenDeletePipeline>,
}

impl ReleaseSweeper {
    pub fn new(policy: RevisionEvictionPolicy, pipeline: Arc<ArchiveThenDeletePipeline>) -> Self {
        Self { policy, pipeline }
    }

    /// Sweep releases one at a time. A release whose history cannot be
    /// fetched is recorded and skipped; a failure to list releases fails the
    /// namespace.
    pub async fn sweep_namespace(
        &self,
        handle: &dyn ReleaseStoreHandle,
        cluster: &ClusterRef,
        namespace: &NamespaceRef,
    ) -> NamespaceOutcome {
        let mut outcome = NamespaceOutcome::new(&namespace.name);

        let releases = match handle
            .list_releases(namespace, &ReleaseStatus::STABLE)
            .await
        {
            Ok(releases) => releases,
            Err(e) => {
                warn!(namespace = %namespace.name, error = %e, "Failed to list releases");
                outcome.list_error = Some(e.to_string());
                return outcome;
            }
        };
        outcome.releases_scanned = releases.len();

        for release in &releases {
            let history = match handle.get_revision_history(release).await {
                Ok(history) => history,
                Err(e) => {
                    warn!(
                        namespace = %namespace.name,
                        release = %release.name,
                        error = %e,
                        "Failed to fetch revision history"
                    );
                    outcome.release_failures.push(ReleaseFailure {
                        release: release.name.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !self.policy.exceeds(history.len()) {
                continue;
            }

            let to_evict = self.policy.evict(history);
            debug!(
                namespace = %namespace.name,
                release = %release.name,
                keep = self.policy.keep(),
                evicting = to_evict.len(),
                "Release over revision limit"
            );

            let result = self
                .pipeline
                .process(handle, cluster, release, to_evict)
                .await;
            outcome.pipelines.push(result);
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::{FakeColdStore, FakeReleaseStore};

    fn sweeper(store: Arc<FakeColdStore>, keep: usize) -> ReleaseSweeper {
        ReleaseSweeper::new(
            RevisionEvictionPolicy::new(keep),
            Arc::new(ArchiveThenDeletePipeline::new(store, None, false)),
        )
    }

    #[tokio::test]
    async fn test_only_over_limit_releases_processed() {
        let cold = Arc::new(FakeColdStore::default());
        let handle = FakeReleaseStore::default()
            .with_release("default", "web", 1..=12)
            .with_release("default", "api", 1..=10)
            .with_release("default", "db", 1..=3);

        let outcome = sweeper(cold.clone(), 10)
            .sweep_namespace(&handle, &ClusterRef::new(1, 1), &NamespaceRef::new(1, "default"))
            .await;

        assert_eq!(outcome.releases_scanned, 3);
        assert_eq!(outcome.pipelines.len(), 1);
        assert_eq!(outcome.pipelines[0].release, "web");
        assert_eq!(outcome.pipelines[0].deleted, vec![1, 2]);
        assert_eq!(handle.versions("default", "web"), (3..=12).collect::<Vec<_>>());
        assert_eq!(handle.versions("default", "api").len(), 10);
    }

    #[tokio::test]
    async fn test_history_failure_isolated_to_release() {
        let cold = Arc::new(FakeColdStore::default());
        let handle = FakeReleaseStore::default()
            .with_release("default", "x", 1..=5)
            .with_release("default", "y", 1..=5);
        handle.fail_history("default", "x");

        let outcome = sweeper(cold, 2)
            .sweep_namespace(&handle, &ClusterRef::new(1, 1), &NamespaceRef::new(1, "default"))
            .await;

        assert_eq!(outcome.release_failures.len(), 1);
        assert_eq!(outcome.release_failures[0].release, "x");
        assert_eq!(outcome.pipelines.len(), 1);
        assert_eq!(outcome.pipelines[0].release, "y");
        assert_eq!(handle.versions("default", "y"), vec![4, 5]);
        assert_eq!(handle.versions("default", "x").len(), 5);
    }

    #[tokio::test]
    async fn test_list_failure_fails_namespace() {
        let cold = Arc::new(FakeColdStore::default());
        let handle = FakeReleaseStore::default().with_release("default", "web", 1..=5);
        handle.fail_list_releases("default");

        let outcome = sweeper(cold.clone(), 2)
            .sweep_namespace(&handle, &ClusterRef::new(1, 1), &NamespaceRef::new(1, "default"))
            .await;

        assert!(outcome.is_failed());
        assert!(outcome.pipelines.is_empty());
        assert!(cold.keys().is_empty());
    }

    #[tokio::test]
    async fn test_unstable_releases_not_listed() {
        let cold = Arc::new(FakeColdStore::default());
        let handle = FakeReleaseStore::default()
            .with_release_status("default", "old", ReleaseStatus::Uninstalling, 1..=5);

        let outcome = sweeper(cold.clone(), 2)
            .sweep_namespace(&handle, &ClusterRef::new(1, 1), &NamespaceRef::new(1, "default"))
            .await;

        assert_eq!(outcome.releases_scanned, 0);
        assert!(cold.keys().is_empty());
    }
}
