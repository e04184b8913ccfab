//! Release agent client over HTTP.
//!
//! Every cluster runs an agent exposing its release store:
//!
//! | Method   | Path                                                         |
//! |----------|--------------------------------------------------------------|
//! | `GET`    | `/healthz`                                                   |
//! | `GET`    | `/api/v1/namespaces`                                         |
//! | `GET`    | `/api/v1/namespaces/{ns}/releases?status=deployed,failed,..` |
//! | `GET`    | `/api/v1/namespaces/{ns}/releases/{name}/history`            |
//! | `DELETE` | `/api/v1/namespaces/{ns}/releases/{name}/revisions/{version}`|
//!
//! List endpoints answer `{"items": [...]}`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::instrument;
use url::Url;

use super::{ClusterConnector, ConnectError, ReleaseStoreError, ReleaseStoreHandle};
use crate::{
    config::ConnectorConfig,
    models::{ClusterRef, NamespaceRef, ReleaseRef, ReleaseStatus, Revision},
};

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct NamespaceItem {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseItem {
    name: String,
    #[serde(default)]
    status: Option<ReleaseStatus>,
}

/// Connects to release agents over HTTP(S).
#[derive(Clone)]
pub struct HttpConnector {
    client: Client,
    endpoint_template: Option<String>,
    token: Option<String>,
}

impl HttpConnector {
    pub fn new(config: &ConnectorConfig) -> Result<Self, ConnectError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint_template: config.endpoint_template.clone(),
            token: config.token.clone(),
        })
    }

    /// Resolve the agent base URL for a cluster.
    fn endpoint_for(&self, cluster: &ClusterRef) -> Result<Url, ConnectError> {
        let raw = match (&cluster.endpoint, &self.endpoint_template) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(template)) => template
                .replace("{cluster_id}", &cluster.id.to_string())
                .replace("{project_id}", &cluster.project_id.to_string()),
            (None, None) => {
                return Err(ConnectError::NoEndpoint {
                    cluster_id: cluster.id,
                });
            }
        };

        let url = Url::parse(&raw).map_err(|e| ConnectError::InvalidEndpoint {
            endpoint: raw.clone(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConnectError::InvalidEndpoint {
                endpoint: raw,
                reason: "expected an http(s) base URL".to_string(),
            });
        }
        Ok(url)
    }
}

#[async_trait]
impl ClusterConnector for HttpConnector {
    #[instrument(skip(self, cluster), fields(cluster_id = cluster.id))]
    async fn connect(
        &self,
        cluster: &ClusterRef,
    ) -> Result<Box<dyn ReleaseStoreHandle>, ConnectError> {
        let base = self.endpoint_for(cluster)?;
        let store = HttpReleaseStore {
            client: self.client.clone(),
            base,
            token: self.token.clone(),
            cluster_id: cluster.id,
        };

        let health = store
            .url(&["healthz"])
            .map_err(|e| ConnectError::Unreachable(e.to_string()))?;
        let response = store.authorize(store.client.get(health)).send().await?;
        if !response.status().is_success() {
            return Err(ConnectError::Unhealthy {
                status: response.status().as_u16(),
            });
        }

        tracing::debug!(endpoint = %store.base, "Connected to release agent");
        Ok(Box::new(store))
    }
}

/// Session with a single cluster's release agent.
pub struct HttpReleaseStore {
    client: Client,
    base: Url,
    token: Option<String>,
    cluster_id: u64,
}

impl HttpReleaseStore {
    fn url(&self, segments: &[&str]) -> Result<Url, ReleaseStoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ReleaseStoreError::Unavailable(format!("{} cannot be a base URL", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_items<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, ReleaseStoreError> {
        let response = self.authorize(self.client.get(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReleaseStoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let list: ItemList<T> = response.json().await?;
        Ok(list.items)
    }
}

#[async_trait]
impl ReleaseStoreHandle for HttpReleaseStore {
    async fn list_namespaces(&self) -> Result<Vec<NamespaceRef>, ReleaseStoreError> {
        let items: Vec<NamespaceItem> = self.get_items(self.url(&["api", "v1", "namespaces"])?).await?;
        Ok(items
            .into_iter()
            .map(|ns| NamespaceRef::new(self.cluster_id, ns.name))
            .collect())
    }

    async fn list_releases(
        &self,
        namespace: &NamespaceRef,
        status_filter: &[ReleaseStatus],
    ) -> Result<Vec<ReleaseRef>, ReleaseStoreError> {
        let mut url = self.url(&["api", "v1", "namespaces", &namespace.name, "releases"])?;
        if !status_filter.is_empty() {
            let statuses = status_filter
                .iter()
                .map(ReleaseStatus::as_str)
                .collect::<Vec<_>>()
                .join(",");
            url.query_pairs_mut().append_pair("status", &statuses);
        }

        let items: Vec<ReleaseItem> = self.get_items(url).await?;
        Ok(items
            .into_iter()
            .map(|item| ReleaseRef {
                name: item.name,
                namespace: namespace.name.clone(),
                status: item.status.unwrap_or(ReleaseStatus::Deployed),
            })
            .filter(|release| status_filter.is_empty() || status_filter.contains(&release.status))
            .collect())
    }

    async fn get_revision_history(
        &self,
        release: &ReleaseRef,
    ) -> Result<Vec<Revision>, ReleaseStoreError> {
        let url = self.url(&[
            "api",
            "v1",
            "namespaces",
            &release.namespace,
            "releases",
            &release.name,
            "history",
        ])?;
        self.get_items(url).await
    }

    async fn delete_revision(
        &self,
        release: &ReleaseRef,
        version: u64,
    ) -> Result<(), ReleaseStoreError> {
        let version = version.to_string();
        let url = self.url(&[
            "api",
            "v1",
            "namespaces",
            &release.namespace,
            "releases",
            &release.name,
            "revisions",
            &version,
        ])?;

        let response = self.authorize(self.client.delete(url)).send().await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(ReleaseStoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
