use std::sync::Arc;

use thiserror::Error;

use super::{
    ArchiveThenDeletePipeline, ClusterSweepTask, FleetCoordinator, ReleaseSweeper,
    RevisionEvictionPolicy,
};
use crate::{
    cluster::{ClusterConnector, ConnectError, HttpConnector, RetryingConnector},
    config::ReaperConfig,
    directory::{DirectoryError, create_cluster_directory},
    storage::{ColdStoreError, create_cold_store},
};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Failed to open cluster directory: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Failed to build cluster connector: {0}")]
    Connector(#[from] ConnectError),

    #[error("Failed to open cold storage: {0}")]
    ColdStore(#[from] ColdStoreError),
}

/// Assemble the full sweep stack from configuration.
pub async fn build_coordinator(config: &ReaperConfig) -> Result<FleetCoordinator, SetupError> {
    let retention = &config.retention;
    let dry_run = retention.safety.dry_run;

    let directory = create_cluster_directory(&config.directory).await?;

    let http: Arc<dyn ClusterConnector> = Arc::new(HttpConnector::new(&config.connector)?);
    let connector = Arc::new(RetryingConnector::new(http, &config.connector.retry));

    let cold_store = create_cold_store(&config.cold_storage).await?;
    let pipeline = Arc::new(ArchiveThenDeletePipeline::new(
        cold_store,
        config.cold_storage.key_prefix.clone(),
        dry_run,
    ));
    let sweeper = Arc::new(ReleaseSweeper::new(
        RevisionEvictionPolicy::new(retention.max_revisions_per_release),
        pipeline,
    ));
    let task = Arc::new(ClusterSweepTask::new(connector, sweeper));

    Ok(FleetCoordinator::new(
        directory,
        task,
        retention.batch_size as u64,
        dry_run,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DirectoryConfig, FilesystemArchiveConfig};

    #[tokio::test]
    async fn test_builds_from_static_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ReaperConfig::default();
        config.directory = DirectoryConfig::Static { clusters: vec![] };
        config.cold_storage.filesystem = Some(FilesystemArchiveConfig {
            path: dir.path().join("archive").to_string_lossy().into_owned(),
            ..Default::default()
        });
        config.cold_storage.encryption_key = Some("ab".repeat(32));

        let coordinator = build_coordinator(&config).await.unwrap();
        let summary = coordinator.run().await.unwrap();
        assert_eq!(summary.clusters_swept, 0);
        assert!(!summary.dry_run);
    }

    #[tokio::test]
    async fn test_invalid_encryption_key_rejected() {
        let mut config = ReaperConfig::default();
        config.directory = DirectoryConfig::Static { clusters: vec![] };
        config.cold_storage.encryption_key = Some("not-hex".into());

        let err = build_coordinator(&config).await.err().unwrap();
        assert!(matches!(err, SetupError::ColdStore(ColdStoreError::Config(_))));
    }
}
