//! Cluster connector configuration.
//!
//! # Example
//!
//! ```toml
//! [connector]
//! endpoint_template = "https://agent.c{cluster_id}.internal"
//! token = "${CLUSTER_AGENT_TOKEN}"
//! timeout_secs = 5
//!
//! [connector.retry]
//! max_attempts = 3
//! backoff_ms = 1000
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Settings for reaching each cluster's release agent.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectorConfig {
    /// Endpoint used for clusters whose directory entry carries none.
    /// `{cluster_id}` and `{project_id}` are substituted.
    #[serde(default)]
    pub endpoint_template: Option<String>,

    /// Bearer token sent to every release agent.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout in seconds.
    /// Default: 5
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry settings for establishing a connection.
    #[serde(default)]
    pub retry: ConnectRetryConfig,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            endpoint_template: None,
            token: None,
            timeout_secs: default_timeout_secs(),
            retry: ConnectRetryConfig::default(),
        }
    }
}

impl std::fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("endpoint_template", &self.endpoint_template)
            .field("token", &self.token.as_ref().map(|_| "****"))
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

fn default_timeout_secs() -> u64 {
    5
}

impl ConnectorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "connector.timeout_secs must be greater than 0".into(),
            ));
        }
        if let Some(template) = &self.endpoint_template
            && !template.starts_with("http://")
            && !template.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "connector.endpoint_template must be an http(s) URL, got '{}'",
                template
            )));
        }
        self.retry.validate()
    }
}

/// Fixed-backoff retry for connecting to a cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectRetryConfig {
    /// Total number of attempts, including the first.
    /// Default: 3
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds.
    /// Default: 1000
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for ConnectRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

impl ConnectRetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "connector.retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectorConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_masks_token() {
        let config = ConnectorConfig {
            token: Some("super-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("****"));
    }

    #[test]
    fn test_invalid_template_rejected() {
        let config = ConnectorConfig {
            endpoint_template: Some("agent.internal".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let toml = r#"
            [retry]
            max_attempts = 0
        "#;
        let config: ConnectorConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }
}
