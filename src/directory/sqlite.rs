use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::{ClusterDirectory, ClusterFilter, ClusterPage, DirectoryError, bind_u64, row_id};
use crate::{config::SqliteDirectoryConfig, models::ClusterRef};

pub struct SqliteClusterDirectory {
    pool: SqlitePool,
}

impl SqliteClusterDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &SqliteDirectoryConfig) -> Result<Self, DirectoryError> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(
                sqlx::sqlite::SqliteConnectOptions::new()
                    .filename(&config.path)
                    .read_only(true)
                    .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms)),
            )
            .await?;
        Ok(Self::new(pool))
    }

    fn where_clause(filter: ClusterFilter) -> &'static str {
        if filter.monitor_releases_only {
            "WHERE monitor_helm_releases = 1"
        } else {
            ""
        }
    }

    fn parse_cluster(row: &sqlx::sqlite::SqliteRow) -> Result<ClusterRef, DirectoryError> {
        let id = row_id("id", row.try_get("id")?)?;
        let project_id = row_id("project_id", row.try_get("project_id")?)?;
        let name: Option<String> = row.try_get("name")?;
        Ok(ClusterRef {
            id,
            project_id,
            name: name.unwrap_or_else(|| format!("cluster-{id}")),
            monitor_releases: row.try_get("monitor_helm_releases")?,
            endpoint: row.try_get("agent_endpoint")?,
        })
    }
}

#[async_trait]
impl ClusterDirectory for SqliteClusterDirectory {
    async fn list_clusters(
        &self,
        filter: ClusterFilter,
        offset: u64,
        limit: u64,
    ) -> Result<ClusterPage, DirectoryError> {
        let where_clause = Self::where_clause(filter);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM clusters {where_clause}"
        ))
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT id, project_id, name, agent_endpoint, monitor_helm_releases
            FROM clusters
            {where_clause}
            ORDER BY id ASC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(bind_u64(limit))
        .bind(bind_u64(offset))
        .fetch_all(&self.pool)
        .await?;

        let clusters = rows
            .iter()
            .map(Self::parse_cluster)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ClusterPage {
            clusters,
            total: row_id("count", total)?,
        })
    }
}
