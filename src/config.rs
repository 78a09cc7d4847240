// src/config.rs - Server configuration with YAML support and validation
use crate::error::{AeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest severity an event or sub-condition may carry (OPC A&E fixes this
/// at 1000).
pub const MAX_SEVERITY: u16 = 1000;

/// Server-wide configuration for an [`EventSpace`](crate::event_space::EventSpace)
///
/// Loaded from YAML at startup; every field has a sensible default so an
/// empty document is a valid configuration.
///
/// # Examples
///
/// ```rust
/// use aera::ServerConfig;
///
/// let config = ServerConfig::from_yaml("min_severity: 0\n").unwrap();
/// assert_eq!(config.min_severity, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Lowest valid severity. The OPC spec text is ambiguous about whether
    /// this is 0 or 1, so it is a configured boundary rather than a constant.
    pub min_severity: u16,

    /// Whether a refresh snapshot also includes conditions that are enabled
    /// but not currently active. Server policy, not fixed by the core.
    pub refresh_include_inactive: bool,

    /// Initial buffer time for new subscriptions, in milliseconds.
    /// Zero means every event is flushed to the client as it arrives.
    pub default_buffer_time_ms: u64,

    /// Initial flush high-water mark for new subscriptions: once this many
    /// events are buffered a notification is issued immediately.
    pub default_max_batch: usize,

    /// Hard cap on a subscription's buffered events. When a client stalls
    /// and the queue reaches this length, the oldest entries are dropped.
    pub max_queue_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            min_severity: 1,
            refresh_include_inactive: false,
            default_buffer_time_ms: 0,
            default_max_batch: 64,
            max_queue_len: 8192,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges and cross-field consistency
    pub fn validate(&self) -> Result<()> {
        if self.min_severity > 1 {
            return Err(AeError::Config(format!(
                "min_severity must be 0 or 1, got {}",
                self.min_severity
            )));
        }
        if self.default_max_batch == 0 {
            return Err(AeError::Config(
                "default_max_batch must be at least 1".into(),
            ));
        }
        if self.max_queue_len < self.default_max_batch {
            return Err(AeError::Config(format!(
                "max_queue_len ({}) must not be smaller than default_max_batch ({})",
                self.max_queue_len, self.default_max_batch
            )));
        }
        Ok(())
    }

    /// Check a severity against the configured bounds
    pub fn severity_in_range(&self, severity: u16) -> bool {
        severity >= self.min_severity && severity <= MAX_SEVERITY
    }
}
