//! Engine configuration.
//!
//! Timeouts are passed explicitly at construction; there is no process-wide
//! default timeout to mutate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::result::{DomscopeError, DomscopeResult};

/// Default polling timeout for find and exists (5 seconds)
pub const DEFAULT_FIND_TIMEOUT_MS: u64 = 5000;

/// Default sleep between refresh attempts (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default per-command timeout (30 seconds)
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;

/// Default settle delay after a navigate command (500ms)
pub const DEFAULT_NAVIGATE_SETTLE_MS: u64 = 500;

/// Timeouts and delays used by a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Polling timeout for find and exists
    pub find_timeout_ms: u64,
    /// Sleep between refresh attempts
    pub poll_interval_ms: u64,
    /// Timeout for one remote command
    pub command_timeout_ms: u64,
    /// Delay after a successful navigate
    pub navigate_settle_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            find_timeout_ms: DEFAULT_FIND_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            navigate_settle_ms: DEFAULT_NAVIGATE_SETTLE_MS,
        }
    }
}

impl EngineConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the find timeout
    #[must_use]
    pub const fn with_find_timeout(mut self, ms: u64) -> Self {
        self.find_timeout_ms = ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the command timeout
    #[must_use]
    pub const fn with_command_timeout(mut self, ms: u64) -> Self {
        self.command_timeout_ms = ms;
        self
    }

    /// Set the navigate settle delay
    #[must_use]
    pub const fn with_navigate_settle(mut self, ms: u64) -> Self {
        self.navigate_settle_ms = ms;
        self
    }

    /// Find timeout as a duration
    #[must_use]
    pub const fn find_timeout(&self) -> Duration {
        Duration::from_millis(self.find_timeout_ms)
    }

    /// Poll interval as a duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Command timeout as a duration
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Navigate settle delay as a duration
    #[must_use]
    pub const fn navigate_settle(&self) -> Duration {
        Duration::from_millis(self.navigate_settle_ms)
    }

    /// Parse from YAML; missing keys take their defaults
    pub fn from_yaml_str(yaml: &str) -> DomscopeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> DomscopeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> DomscopeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    fn validate(&self) -> DomscopeResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(DomscopeError::malformed("poll_interval_ms must be positive"));
        }
        if self.command_timeout_ms == 0 {
            return Err(DomscopeError::malformed("command_timeout_ms must be positive"));
        }
        Ok(())
    }
}
