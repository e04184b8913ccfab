//! Cluster directory: the paged source of clusters to sweep.
//!
//! Backends:
//! - [`StaticClusterDirectory`]: clusters listed in the config file
//! - `SqliteClusterDirectory` / `PostgresClusterDirectory`: a `clusters` table
//!   with columns `id, project_id, name, agent_endpoint, monitor_helm_releases`

#[cfg(feature = "database-postgres")]
mod postgres;
#[cfg(feature = "database-sqlite")]
mod sqlite;
mod static_list;

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "database-postgres")]
pub use postgres::PostgresClusterDirectory;
#[cfg(feature = "database-sqlite")]
pub use sqlite::SqliteClusterDirectory;
pub use static_list::StaticClusterDirectory;
use thiserror::Error;

use crate::{config::DirectoryConfig, models::ClusterRef};

/// Which clusters a listing should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterFilter {
    /// Only clusters that opted into release revision capping.
    pub monitor_releases_only: bool,
}

impl ClusterFilter {
    /// Clusters whose release revisions are capped by the retention job.
    pub fn retention_monitored() -> Self {
        Self {
            monitor_releases_only: true,
        }
    }

    pub fn matches(&self, cluster: &ClusterRef) -> bool {
        !self.monitor_releases_only || cluster.monitor_releases
    }
}

/// One page of clusters, ordered by ascending id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterPage {
    pub clusters: Vec<ClusterRef>,
    /// Number of clusters matching the filter across all pages.
    pub total: u64,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid cluster row: {0}")]
    InvalidRow(String),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to the set of clusters.
#[async_trait]
pub trait ClusterDirectory: Send + Sync {
    /// Return up to `limit` clusters matching `filter`, skipping the first
    /// `offset`, in ascending id order.
    async fn list_clusters(
        &self,
        filter: ClusterFilter,
        offset: u64,
        limit: u64,
    ) -> Result<ClusterPage, DirectoryError>;
}

/// Create a cluster directory from configuration.
pub async fn create_cluster_directory(
    config: &DirectoryConfig,
) -> Result<Arc<dyn ClusterDirectory>, DirectoryError> {
    match config {
        DirectoryConfig::Static { clusters } => {
            tracing::info!(clusters = clusters.len(), "Using static cluster directory");
            Ok(Arc::new(StaticClusterDirectory::new(clusters.clone())))
        }
        #[cfg(feature = "database-sqlite")]
        DirectoryConfig::Sqlite(cfg) => {
            tracing::info!(path = %cfg.path, "Using SQLite cluster directory");
            Ok(Arc::new(SqliteClusterDirectory::connect(cfg).await?))
        }
        #[cfg(feature = "database-postgres")]
        DirectoryConfig::Postgres(cfg) => {
            tracing::info!("Using PostgreSQL cluster directory");
            Ok(Arc::new(PostgresClusterDirectory::connect(cfg).await?))
        }
    }
}

/// Convert a signed database id to the unsigned id used throughout the crate.
#[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
fn row_id(column: &str, value: i64) -> Result<u64, DirectoryError> {
    u64::try_from(value)
        .map_err(|_| DirectoryError::InvalidRow(format!("negative {column}: {value}")))
}

/// Convert an unsigned offset or limit to a bind parameter.
#[cfg(any(feature = "database-sqlite", feature = "database-postgres"))]
fn bind_u64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
