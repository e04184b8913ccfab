use async_trait::async_trait;

use super::{ClusterDirectory, ClusterFilter, ClusterPage, DirectoryError};
use crate::models::ClusterRef;

/// Directory backed by a fixed list of clusters.
#[derive(Debug, Clone)]
pub struct StaticClusterDirectory {
    clusters: Vec<ClusterRef>,
}

impl StaticClusterDirectory {
    pub fn new(mut clusters: Vec<ClusterRef>) -> Self {
        clusters.sort_by_key(|c| c.id);
        Self { clusters }
    }
}

#[async_trait]
impl ClusterDirectory for StaticClusterDirectory {
    async fn list_clusters(
        &self,
        filter: ClusterFilter,
        offset: u64,
        limit: u64,
    ) -> Result<ClusterPage, DirectoryError> {
        let matching: Vec<&ClusterRef> = self
            .clusters
            .iter()
            .filter(|c| filter.matches(c))
            .collect();

        let clusters = matching
            .iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|c| (*c).clone())
            .collect();

        Ok(ClusterPage {
            clusters,
            total: matching.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> StaticClusterDirectory {
        let mut unmonitored = ClusterRef::new(3, 1);
        unmonitored.monitor_releases = false;
        StaticClusterDirectory::new(vec![
            ClusterRef::new(5, 2),
            ClusterRef::new(1, 1),
            unmonitored,
            ClusterRef::new(2, 1),
        ])
    }

    #[tokio::test]
    async fn test_pages_in_id_order() {
        let directory = fleet();
        let filter = ClusterFilter::retention_monitored();

        let first = directory.list_clusters(filter, 0, 2).await.unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(
            first.clusters.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let second = directory.list_clusters(filter, 2, 2).await.unwrap();
        assert_eq!(
            second.clusters.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![5]
        );

        let past_end = directory.list_clusters(filter, 10, 2).await.unwrap();
        assert!(past_end.clusters.is_empty());
        assert_eq!(past_end.total, 3);
    }

    #[tokio::test]
    async fn test_unfiltered_includes_unmonitored() {
        let page = fleet()
            .list_clusters(ClusterFilter::default(), 0, 10)
            .await
            .unwrap();
        assert_eq!(page.total, 4);
        assert!(page.clusters.iter().any(|c| c.id == 3));
    }
}
