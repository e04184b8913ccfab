//! Bounded fixed-backoff retry around any [`ClusterConnector`].

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ClusterConnector, ConnectError, ReleaseStoreHandle};
use crate::{config::ConnectRetryConfig, models::ClusterRef};

/// Retries `connect` up to `max_attempts` times with a fixed delay between
/// attempts. Errors that cannot succeed on retry are returned immediately.
pub struct RetryingConnector {
    inner: Arc<dyn ClusterConnector>,
    max_attempts: u32,
    backoff: Duration,
}

impl RetryingConnector {
    pub fn new(inner: Arc<dyn ClusterConnector>, config: &ConnectRetryConfig) -> Self {
        Self {
            inner,
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff(),
        }
    }
}

#[async_trait]
impl ClusterConnector for RetryingConnector {
    async fn connect(
        &self,
        cluster: &ClusterRef,
    ) -> Result<Box<dyn ReleaseStoreHandle>, ConnectError> {
        let mut attempt = 1;
        loop {
            match self.inner.connect(cluster).await {
                Ok(handle) => {
                    if attempt > 1 {
                        debug!(
                            cluster_id = cluster.id,
                            attempt, "Connected to cluster after retry"
                        );
                    }
                    return Ok(handle);
                }
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        cluster_id = cluster.id,
                        error = %error,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = self.backoff.as_millis(),
                        "Cluster connect failed, will retry after delay"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(error) => {
                    if attempt > 1 {
                        warn!(
                            cluster_id = cluster.id,
                            error = %error,
                            attempts = attempt,
                            "Cluster connect failed after all retry attempts"
                        );
                    }
                    return Err(error);
                }
            }
        }
    }
}
