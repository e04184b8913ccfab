use thiserror::Error;

/// Failure to establish a session with a cluster.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("cluster {cluster_id} has no agent endpoint and no endpoint template is configured")]
    NoEndpoint { cluster_id: u64 },

    #[error("invalid agent endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("agent request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("agent health check returned HTTP {status}")]
    Unhealthy { status: u16 },

    #[error("cluster unreachable: {0}")]
    Unreachable(String),
}

impl ConnectError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConnectError::NoEndpoint { .. } | ConnectError::InvalidEndpoint { .. } => false,
            ConnectError::Transport(_)
            | ConnectError::Unhealthy { .. }
            | ConnectError::Unreachable(_) => true,
        }
    }
}

/// Failure of a single call on an established session.
#[derive(Debug, Error)]
pub enum ReleaseStoreError {
    #[error("agent request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("agent returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("release store unavailable: {0}")]
    Unavailable(String),
}
