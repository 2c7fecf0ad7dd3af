//! Compiler configuration.

use crate::error::{Result, StateError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default interval between refresh sweeps, in milliseconds.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 10_000;

/// Configuration for the board state compiler.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Interval between refresh sweeps of master boards, in milliseconds.
    pub update_interval_ms: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
        }
    }
}

impl CompilerConfig {
    /// Sets the refresh interval, saturating at `u64::MAX` milliseconds.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Returns the refresh interval.
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Fails with `Internal` if the configuration cannot drive a compiler.
    pub fn validate(&self) -> Result<()> {
        if self.update_interval_ms == 0 {
            return Err(StateError::internal("update interval must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.update_interval(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: CompilerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CompilerConfig::default());
        let config: CompilerConfig =
            serde_json::from_str(r#"{"update_interval_ms": 250}"#).unwrap();
        assert_eq!(config.update_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = CompilerConfig::default().with_update_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(StateError::Internal(_))));
    }

    #[test]
    fn test_huge_interval_saturates() {
        let config = CompilerConfig::default().with_update_interval(Duration::MAX);
        assert_eq!(config.update_interval_ms, u64::MAX);

        let config = CompilerConfig::default().with_update_interval(Duration::from_millis(1500));
        assert_eq!(config.update_interval_ms, 1500);
    }
}
