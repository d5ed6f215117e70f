//! Slicer configuration
//!
//! Environment-derived settings for the external slicer CLI. Out-of-range
//! values are clamped, unparseable values fall back to defaults with a
//! warning, so a misconfigured host degrades rather than refusing to boot.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Environment variable naming the slicer binary.
pub const ENV_SLICER_BIN: &str = "QUICKSLICE_SLICER_BIN";
/// Environment variable that short-circuits slicing to fallback metrics.
pub const ENV_SLICER_DISABLED: &str = "QUICKSLICE_SLICER_DISABLED";
/// Environment variable bounding concurrent slicer processes.
pub const ENV_SLICER_CONCURRENCY: &str = "QUICKSLICE_SLICER_CONCURRENCY";
/// Environment variable for the per-slice wall-clock timeout.
pub const ENV_SLICER_TIMEOUT_MS: &str = "QUICKSLICE_SLICER_TIMEOUT_MS";
/// Environment variable for the total attempt cap per slice call.
pub const ENV_SLICER_ATTEMPTS: &str = "QUICKSLICE_SLICER_ATTEMPTS";

const DEFAULT_BINARY: &str = "prusa-slicer";
const DEFAULT_CONCURRENCY: usize = 2;
const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_ATTEMPTS: u32 = 2;

/// Configuration for the slicing orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicerConfig {
    /// Slicer binary name or path.
    #[serde(default = "default_binary")]
    pub binary: String,

    /// When set, no process is ever spawned; every slice resolves to
    /// fallback metrics. For hosts without the binary installed.
    #[serde(default)]
    pub disabled: bool,

    /// Maximum concurrent slicer processes, clamped to 1..=4.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-slice wall-clock timeout in milliseconds, clamped to
    /// 30_000..=300_000.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Total attempts per slice call (first try + retries), clamped to
    /// 1..=5.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

fn default_binary() -> String {
    DEFAULT_BINARY.to_string()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            disabled: false,
            concurrency: DEFAULT_CONCURRENCY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            attempts: DEFAULT_ATTEMPTS,
        }
    }
}

impl SlicerConfig {
    /// Read configuration from the environment, applying clamps.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(binary) = env::var(ENV_SLICER_BIN)
            && !binary.trim().is_empty()
        {
            config.binary = binary;
        }

        config.disabled = env::var(ENV_SLICER_DISABLED)
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);

        config.concurrency = parse_env(ENV_SLICER_CONCURRENCY, DEFAULT_CONCURRENCY);
        config.timeout_ms = parse_env(ENV_SLICER_TIMEOUT_MS, DEFAULT_TIMEOUT_MS);
        config.attempts = parse_env(ENV_SLICER_ATTEMPTS, DEFAULT_ATTEMPTS);

        config.clamped()
    }

    /// Apply range clamps to every bounded field.
    pub fn clamped(mut self) -> Self {
        self.concurrency = self.concurrency.clamp(1, 4);
        self.timeout_ms = self.timeout_ms.clamp(30_000, 300_000);
        self.attempts = self.attempts.clamp(1, 5);
        self
    }
}

fn parse_env<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable slicer setting, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SlicerConfig::default();
        assert_eq!(config.binary, "prusa-slicer");
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.timeout_ms, 120_000);
        assert_eq!(config.attempts, 2);
        assert!(!config.disabled);
    }

    #[test]
    fn test_clamps() {
        let config = SlicerConfig {
            concurrency: 99,
            timeout_ms: 5,
            attempts: 0,
            ..SlicerConfig::default()
        }
        .clamped();

        assert_eq!(config.concurrency, 4);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.attempts, 1);
    }

    #[test]
    fn test_clamp_upper_timeout() {
        let config = SlicerConfig {
            timeout_ms: 999_999,
            ..SlicerConfig::default()
        }
        .clamped();
        assert_eq!(config.timeout_ms, 300_000);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: SlicerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.binary, "prusa-slicer");
        assert_eq!(config.attempts, 2);
    }
}
