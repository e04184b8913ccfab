use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ClusterRef;

/// Lifecycle status of a release or one of its revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseStatus {
    Deployed,
    Failed,
    Superseded,
    Pending,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
    Uninstalling,
    Uninstalled,
    #[serde(other)]
    Unknown,
}

impl ReleaseStatus {
    /// Statuses whose releases have a retrievable revision history.
    ///
    /// Superseded and uninstall states are transient from the point of view of
    /// the release list and are skipped.
    pub const STABLE: [ReleaseStatus; 6] = [
        ReleaseStatus::Deployed,
        ReleaseStatus::Pending,
        ReleaseStatus::PendingInstall,
        ReleaseStatus::PendingUpgrade,
        ReleaseStatus::PendingRollback,
        ReleaseStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::Deployed => "deployed",
            ReleaseStatus::Failed => "failed",
            ReleaseStatus::Superseded => "superseded",
            ReleaseStatus::Pending => "pending",
            ReleaseStatus::PendingInstall => "pending-install",
            ReleaseStatus::PendingUpgrade => "pending-upgrade",
            ReleaseStatus::PendingRollback => "pending-rollback",
            ReleaseStatus::Uninstalling => "uninstalling",
            ReleaseStatus::Uninstalled => "uninstalled",
            ReleaseStatus::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for ReleaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deployed" => Ok(ReleaseStatus::Deployed),
            "failed" => Ok(ReleaseStatus::Failed),
            "superseded" => Ok(ReleaseStatus::Superseded),
            "pending" => Ok(ReleaseStatus::Pending),
            "pending-install" => Ok(ReleaseStatus::PendingInstall),
            "pending-upgrade" => Ok(ReleaseStatus::PendingUpgrade),
            "pending-rollback" => Ok(ReleaseStatus::PendingRollback),
            "uninstalling" => Ok(ReleaseStatus::Uninstalling),
            "uninstalled" => Ok(ReleaseStatus::Uninstalled),
            "unknown" => Ok(ReleaseStatus::Unknown),
            _ => Err(format!("Invalid release status: {}", s)),
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A release discovered in a namespace during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRef {
    pub name: String,
    pub namespace: String,
    #[serde(default = "default_status")]
    pub status: ReleaseStatus,
}

fn default_status() -> ReleaseStatus {
    ReleaseStatus::Deployed
}

impl ReleaseRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            status: ReleaseStatus::Deployed,
        }
    }
}

/// One immutable historical version of a release.
///
/// Versions are assigned by the live store, unique within a release and
/// never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    /// Name of the release this revision belongs to.
    pub name: String,
    pub namespace: String,
    pub version: u64,
    pub status: ReleaseStatus,
    pub created_at: DateTime<Utc>,
    /// Rendered manifest. `None` when the live store returned no payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Values the revision was rendered with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// Deterministic cold-storage location of an archived revision:
/// `<project_id>/<cluster_id>/<namespace>/<release>/<version>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveKey {
    pub project_id: u64,
    pub cluster_id: u64,
    pub namespace: String,
    pub release: String,
    pub version: u64,
}

impl ArchiveKey {
    pub fn for_revision(cluster: &ClusterRef, release: &ReleaseRef, version: u64) -> Self {
        Self {
            project_id: cluster.project_id,
            cluster_id: cluster.id,
            namespace: release.namespace.clone(),
            release: release.name.clone(),
            version,
        }
    }

    /// Render the key, optionally under a prefix such as `"archive/"`.
    pub fn to_path(&self, prefix: Option<&str>) -> String {
        match prefix.map(|p| p.trim_end_matches('/')).filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{}/{}", prefix, self),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.project_id, self.cluster_id, self.namespace, self.release, self.version
        )
    }
}
