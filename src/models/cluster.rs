use serde::{Deserialize, Serialize};

/// A cluster as recorded in the cluster directory.
///
/// Read-only input to the retention job; the lifecycle is owned by cluster
/// management elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRef {
    pub id: u64,
    pub project_id: u64,
    /// Display name, used only for logging.
    #[serde(default)]
    pub name: String,
    /// Whether release revisions on this cluster should be capped.
    #[serde(default = "default_true")]
    pub monitor_releases: bool,
    /// Base URL of the cluster's release agent. When absent the connector
    /// falls back to its configured endpoint template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl ClusterRef {
    pub fn new(id: u64, project_id: u64) -> Self {
        Self {
            id,
            project_id,
            name: format!("cluster-{id}"),
            monitor_releases: true,
            endpoint: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A namespace discovered on a cluster during a run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceRef {
    pub name: String,
    #[serde(default)]
    pub cluster_id: u64,
}

impl NamespaceRef {
    pub fn new(cluster_id: u64, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster_id,
        }
    }
}
