//! Gateway configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File name looked up inside the `.git` directory.
pub const CONFIG_FILE: &str = "gitgate.toml";

/// Gateway configuration loaded from `.git/gitgate.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

impl GatewayConfig {
    /// Load config from a TOML file, falling back to defaults if it is missing.
    ///
    /// # Errors
    /// Returns error if the file exists but can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save config to a TOML file.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Sliding-window limits applied per method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "enabled")]
    pub enabled: bool,

    /// Calls allowed per method inside one window.
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Total timestamps kept across all methods before idle methods are evicted.
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Budget for calls wrapped in `execute_with_timeout`.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl RateLimitConfig {
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_ms: default_window_ms(),
            history_cap: default_history_cap(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Parameter schema checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "enabled")]
    pub enabled: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

const fn enabled() -> bool {
    true
}

const fn default_max_requests() -> usize {
    100
}

const fn default_window_ms() -> u64 {
    60_000
}

const fn default_history_cap() -> usize {
    10_000
}

const fn default_timeout_ms() -> u64 {
    30_000
}
