use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{ClusterDirectory, ClusterFilter, ClusterPage, DirectoryError, bind_u64, row_id};
use crate::{config::PostgresDirectoryConfig, models::ClusterRef};

pub struct PostgresClusterDirectory {
    pool: PgPool,
}

impl PostgresClusterDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &PostgresDirectoryConfig) -> Result<Self, DirectoryError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl ClusterDirectory for PostgresClusterDirectory {
    async fn list_clusters(
        &self,
        filter: ClusterFilter,
        offset: u64,
        limit: u64,
    ) -> Result<ClusterPage, DirectoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM clusters WHERE ($1 = FALSE OR monitor_helm_releases = TRUE)",
        )
        .bind(filter.monitor_releases_only)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, project_id, name, agent_endpoint, monitor_helm_releases
            FROM clusters
            WHERE ($1 = FALSE OR monitor_helm_releases = TRUE)
            ORDER BY id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.monitor_releases_only)
        .bind(bind_u64(limit))
        .bind(bind_u64(offset))
        .fetch_all(&self.pool)
        .await?;

        let mut clusters = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row_id("id", row.try_get("id")?)?;
            let project_id = row_id("project_id", row.try_get("project_id")?)?;
            let name: Option<String> = row.try_get("name")?;
            clusters.push(ClusterRef {
                id,
                project_id,
                name: name.unwrap_or_else(|| format!("cluster-{id}")),
                monitor_releases: row.try_get("monitor_helm_releases")?,
                endpoint: row.try_get("agent_endpoint")?,
            });
        }

        Ok(ClusterPage {
            clusters,
            total: row_id("count", total)?,
        })
    }
}
