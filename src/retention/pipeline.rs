//! Archive-then-delete for one release's evicted revisions.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::outcome::{PipelineOutcome, RevisionFailure};
use crate::{
    cluster::ReleaseStoreHandle,
    models::{ArchiveKey, ClusterRef, ReleaseRef, Revision},
    observability::metrics,
    storage::ColdStore,
};

/// Moves evicted revisions to cold storage and removes them from the live
/// store. A revision is only deleted after its archive write succeeded.
pub struct ArchiveThenDeletePipeline {
    cold_store: Arc<dyn ColdStore>,
    key_prefix: Option<String>,
    dry_run: bool,
}

impl ArchiveThenDeletePipeline {
    pub fn new(cold_store: Arc<dyn ColdStore>, key_prefix: Option<String>, dry_run: bool) -> Self {
        Self {
            cold_store,
            key_prefix,
            dry_run,
        }
    }

    /// Process every revision independently. Never fails as a whole; each
    /// revision's result is recorded in the returned outcome.
    pub async fn process(
        &self,
        handle: &dyn ReleaseStoreHandle,
        cluster: &ClusterRef,
        release: &ReleaseRef,
        mut to_evict: Vec<Revision>,
    ) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::new(&release.name);
        to_evict.sort_by_key(|r| r.version);

        for revision in &to_evict {
            let version = revision.version;
            let key = ArchiveKey::for_revision(cluster, release, version)
                .to_path(self.key_prefix.as_deref());

            let payload = match serialize_revision(revision) {
                Ok(payload) => payload,
                Err(reason) => {
                    warn!(
                        release = %release.name,
                        namespace = %release.namespace,
                        version,
                        reason = %reason,
                        "Cannot serialize revision, leaving it in place"
                    );
                    metrics::record_revision_failure("serialize");
                    outcome
                        .failures
                        .push(RevisionFailure::Serialize { version, reason });
                    continue;
                }
            };

            if self.dry_run {
                info!(
                    release = %release.name,
                    namespace = %release.namespace,
                    version,
                    key = %key,
                    "DRY RUN: Would archive and delete revision"
                );
                outcome.skipped_dry_run.push(version);
                continue;
            }

            if let Err(e) = self.cold_store.put(&key, payload, true).await {
                warn!(
                    release = %release.name,
                    namespace = %release.namespace,
                    version,
                    key = %key,
                    error = %e,
                    "Failed to archive revision, skipping delete"
                );
                metrics::record_revision_failure("archive");
                outcome.failures.push(RevisionFailure::Archive {
                    version,
                    key,
                    reason: e.to_string(),
                });
                continue;
            }
            outcome.archived.push(version);
            metrics::record_revision_archived(self.cold_store.backend_name());

            match handle.delete_revision(release, version).await {
                Ok(()) => {
                    debug!(
                        release = %release.name,
                        namespace = %release.namespace,
                        version,
                        key = %key,
                        "Revision archived and deleted"
                    );
                    metrics::record_revision_deleted();
                    outcome.deleted.push(version);
                }
                Err(e) => {
                    warn!(
                        release = %release.name,
                        namespace = %release.namespace,
                        version,
                        key = %key,
                        error = %e,
                        "Revision archived but delete failed; will retry next run"
                    );
                    metrics::record_revision_failure("delete");
                    outcome.failures.push(RevisionFailure::Delete {
                        version,
                        key,
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }
}

/// Archival payload for one revision.
fn serialize_revision(revision: &Revision) -> Result<Vec<u8>, String> {
    if revision.manifest.is_none() {
        return Err("revision has no manifest payload".to_string());
    }
    serde_json::to_vec(revision).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fakes::{FakeColdStore, FakeReleaseStore, revision};

    fn web() -> ReleaseRef {
        ReleaseRef::new("default", "web")
    }

    #[tokio::test]
    async fn test_archives_then_deletes_each_revision() {
        let store = Arc::new(FakeColdStore::default());
        let handle = FakeReleaseStore::default();
        let pipeline = ArchiveThenDeletePipeline::new(store.clone(), None, false);

        let outcome = pipeline
            .process(
                &handle,
                &ClusterRef::new(7, 3),
                &web(),
                vec![revision("web", 2), revision("web", 1)],
            )
            .await;

        assert_eq!(outcome.archived, vec![1, 2]);
        assert_eq!(outcome.deleted, vec![1, 2]);
        assert!(outcome.failures.is_empty());
        assert_eq!(
            store.keys(),
            vec!["3/7/default/web/1".to_string(), "3/7/default/web/2".to_string()]
        );
        assert!(store.puts().iter().all(|p| p.encrypted));
        assert_eq!(handle.deleted(), vec![("web".to_string(), 1), ("web".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_key_prefix_applied() {
        let store = Arc::new(FakeColdStore::default());
        let pipeline =
            ArchiveThenDeletePipeline::new(store.clone(), Some("archive/".into()), false);

        pipeline
            .process(
                &FakeReleaseStore::default(),
                &ClusterRef::new(7, 3),
                &web(),
                vec![revision("web", 4)],
            )
            .await;

        assert_eq!(store.keys(), vec!["archive/3/7/default/web/4".to_string()]);
    }

    #[tokio::test]
    async fn test_archive_failure_never_deletes() {
        let store = Arc::new(FakeColdStore::default());
        store.fail_key("3/7/default/web/2");
        let handle = FakeReleaseStore::default();
        let pipeline = ArchiveThenDeletePipeline::new(store.clone(), None, false);

        let outcome = pipeline
            .process(
                &handle,
                &ClusterRef::new(7, 3),
                &web(),
                vec![revision("web", 1), revision("web", 2), revision("web", 3)],
            )
            .await;

        assert_eq!(outcome.archived, vec![1, 3]);
        assert_eq!(outcome.deleted, vec![1, 3]);
        assert_eq!(outcome.failed_archival(), 1);
        assert!(!handle.deleted().iter().any(|(_, v)| *v == 2));
    }

    #[tokio::test]
    async fn test_delete_failure_recorded_after_archive() {
        let store = Arc::new(FakeColdStore::default());
        let handle = FakeReleaseStore::default();
        handle.fail_delete("web", 1);
        let pipeline = ArchiveThenDeletePipeline::new(store.clone(), None, false);

        let outcome = pipeline
            .process(
                &handle,
                &ClusterRef::new(7, 3),
                &web(),
                vec![revision("web", 1), revision("web", 2)],
            )
            .await;

        assert_eq!(outcome.archived, vec![1, 2]);
        assert_eq!(outcome.deleted, vec![2]);
        assert_eq!(
            outcome.failures,
            vec![RevisionFailure::Delete {
                version: 1,
                key: "3/7/default/web/1".into(),
                reason: "release store unavailable: injected delete failure".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_manifest_is_per_revision_error() {
        let store = Arc::new(FakeColdStore::default());
        let handle = FakeReleaseStore::default();
        let pipeline = ArchiveThenDeletePipeline::new(store.clone(), None, false);

        let mut empty = revision("web", 1);
        empty.manifest = None;

        let outcome = pipeline
            .process(
                &handle,
                &ClusterRef::new(7, 3),
                &web(),
                vec![empty, revision("web", 2)],
            )
            .await;

        assert_eq!(outcome.failed_serialization(), 1);
        assert_eq!(outcome.deleted, vec![2]);
        assert_eq!(store.keys(), vec!["3/7/default/web/2".to_string()]);
        assert_eq!(handle.deleted(), vec![("web".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let store = Arc::new(FakeColdStore::default());
        let handle = FakeReleaseStore::default();
        let pipeline = ArchiveThenDeletePipeline::new(store.clone(), None, true);

        let outcome = pipeline
            .process(
                &handle,
                &ClusterRef::new(7, 3),
                &web(),
                vec![revision("web", 1), revision("web", 2)],
            )
            .await;

        assert_eq!(outcome.skipped_dry_run, vec![1, 2]);
        assert!(outcome.archived.is_empty());
        assert!(store.keys().is_empty());
        assert!(handle.deleted().is_empty());
    }

    #[test]
    fn test_payload_is_revision_json() {
        let payload = serialize_revision(&revision("web", 3)).unwrap();
        let decoded: Revision = serde_json::from_slice(&payload).unwrap();
        assert_eq!(decoded, revision("web", 3));
    }
}
