//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! enabled = true
//! quiet_period_ms = 300     # Wait after the last change before rebuilding
//! cooldown_ms = 800         # Minimum gap between two rebuilds
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Filesystem watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    pub quiet_period_ms: u64,
    pub cooldown_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            quiet_period_ms: 300,
            cooldown_ms: 800,
        }
    }
}

impl WatchConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}
