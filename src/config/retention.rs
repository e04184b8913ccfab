//! Revision retention configuration.
//!
//! Caps the number of stored revisions per release across every cluster that
//! opted into release monitoring.
//!
//! # Example
//!
//! ```toml
//! [retention]
//! enabled = true
//! interval_secs = 3600
//! max_revisions_per_release = 100
//! batch_size = 50
//!
//! [retention.safety]
//! dry_run = false
//! ```

use serde::{Deserialize, Serialize};

/// Revision retention configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Whether the periodic worker runs at all.
    /// Default: true
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How often the worker starts a new pass (in seconds).
    /// Default: 3600 (hourly)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Number of most recent revisions kept per release.
    /// Older revisions are archived to cold storage, then deleted.
    /// Default: 100
    #[serde(default = "default_max_revisions_per_release")]
    pub max_revisions_per_release: usize,

    /// Number of clusters fetched from the directory and swept concurrently.
    /// The next page is only fetched once every cluster in the batch is done.
    /// Default: 50
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Safety settings.
    #[serde(default)]
    pub safety: RetentionSafety,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
            max_revisions_per_release: default_max_revisions_per_release(),
            batch_size: default_batch_size(),
            safety: RetentionSafety::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_max_revisions_per_release() -> usize {
    100
}

fn default_batch_size() -> usize {
    50
}

/// Safety settings for retention runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionSafety {
    /// If true, log which revisions would be archived and deleted without
    /// touching cold storage or the live store.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

impl RetentionConfig {
    /// Get the interval as a Duration.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_revisions_per_release == 0 {
            return Err("retention.max_revisions_per_release must be at least 1".to_string());
        }
        if self.batch_size == 0 {
            return Err("retention.batch_size must be at least 1".to_string());
        }
        if self.enabled && self.interval_secs == 0 {
            return Err("retention.interval_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
