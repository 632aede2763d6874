//! Host configuration: TOML file plus environment overrides.
//!
//! ```toml
//! max_batch_size = 4      # 0 selects the default of 10
//! device = "cpu"          # cpu | metal | cpu-metal
//! error_buffer_len = 256
//! ```
//!
//! `ZKBRIDGE_MAX_BATCH_SIZE` and `ZKBRIDGE_DEVICE` override the file.

use crate::{BatchConfig, DeviceType};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable overriding [`BridgeConfig::max_batch_size`].
pub const ENV_MAX_BATCH_SIZE: &str = "ZKBRIDGE_MAX_BATCH_SIZE";
/// Environment variable overriding [`BridgeConfig::device`].
pub const ENV_DEVICE: &str = "ZKBRIDGE_DEVICE";

/// Settings a host (CLI, bindings) applies to bridge calls.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Maximum jobs in flight per batch; `0` means the default.
    pub max_batch_size: usize,
    /// Device requested for proving.
    pub device: DeviceType,
    /// Size of the error buffer hosts allocate, terminator included.
    pub error_buffer_len: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 0,
            device: DeviceType::Cpu,
            error_buffer_len: 256,
        }
    }
}

impl BridgeConfig {
    /// Parse from TOML text.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        toml::from_str(src).context("parse zkbridge config TOML")
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml_str(&src).with_context(|| format!("in {}", path.display()))
    }

    /// Apply `ZKBRIDGE_*` variables from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_MAX_BATCH_SIZE) {
            self.max_batch_size = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_BATCH_SIZE}={v} is not a batch size"))?;
        }
        if let Some(v) = lookup(ENV_DEVICE) {
            self.device = v.parse().map_err(|e| anyhow!("{ENV_DEVICE}: {e}"))?;
        }
        Ok(self)
    }

    /// Batch limits derived from this config.
    #[must_use]
    pub const fn batch_config(&self) -> BatchConfig {
        BatchConfig::new(self.max_batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, BridgeConfig::default());
        assert_eq!(cfg.batch_config().max_batch_size(), 10);
    }

    #[test]
    fn parses_all_fields() {
        let cfg = BridgeConfig::from_toml_str(
            "max_batch_size = 4\ndevice = \"cpu-metal\"\nerror_buffer_len = 64\n",
        )
        .unwrap();
        assert_eq!(cfg.max_batch_size, 4);
        assert_eq!(cfg.device, DeviceType::CpuMetal);
        assert_eq!(cfg.error_buffer_len, 64);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(BridgeConfig::from_toml_str("max_batch = 4").is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let env: HashMap<&str, &str> =
            [(ENV_MAX_BATCH_SIZE, " 3 "), (ENV_DEVICE, "metal")].into_iter().collect();
        let cfg = BridgeConfig::default()
            .apply_overrides(|k| env.get(k).map(|v| (*v).to_string()))
            .unwrap();
        assert_eq!(cfg.max_batch_size, 3);
        assert_eq!(cfg.device, DeviceType::Metal);
    }

    #[test]
    fn bad_override_is_an_error() {
        let err = BridgeConfig::default()
            .apply_overrides(|k| (k == ENV_MAX_BATCH_SIZE).then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_BATCH_SIZE));
    }
}
