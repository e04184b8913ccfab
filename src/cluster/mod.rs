//! Access to the release store on each cluster.
//!
//! A [`ClusterConnector`] turns a [`ClusterRef`] into a [`ReleaseStoreHandle`],
//! which lists namespaces, releases and revision histories and deletes
//! individual revisions. Each cluster task owns its handle exclusively.

mod error;
mod http;
mod retry;

use async_trait::async_trait;
pub use error::{ConnectError, ReleaseStoreError};
pub use http::{HttpConnector, HttpReleaseStore};
pub use retry::RetryingConnector;

use crate::models::{ClusterRef, NamespaceRef, ReleaseRef, ReleaseStatus, Revision};

/// Establishes a session with one cluster's release store.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(
        &self,
        cluster: &ClusterRef,
    ) -> Result<Box<dyn ReleaseStoreHandle>, ConnectError>;
}

/// A live session with one cluster's release store.
#[async_trait]
pub trait ReleaseStoreHandle: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceRef>, ReleaseStoreError>;

    /// List releases in `namespace` whose status is one of `status_filter`.
    async fn list_releases(
        &self,
        namespace: &NamespaceRef,
        status_filter: &[ReleaseStatus],
    ) -> Result<Vec<ReleaseRef>, ReleaseStoreError>;

    /// Every stored revision of `release`, in no particular order.
    async fn get_revision_history(
        &self,
        release: &ReleaseRef,
    ) -> Result<Vec<Revision>, ReleaseStoreError>;

    /// Delete exactly one revision. Deleting a revision that no longer exists
    /// succeeds.
    async fn delete_revision(
        &self,
        release: &ReleaseRef,
        version: u64,
    ) -> Result<(), ReleaseStoreError>;
}
