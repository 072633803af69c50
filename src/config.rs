//! Configuration loading and defaults for nvpowermizerd.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::controller::ControllerConfig;

/// Main configuration for nvpowermizerd.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How long the system must be idle before switching to low power,
    /// in milliseconds (default: 20000).
    pub idle_threshold_ms: u64,

    /// Poll interval while in low-power mode, in milliseconds (default: 10).
    /// Short, so user activity is reacted to with minimal latency.
    pub poll_low_power_ms: u64,

    /// Poll interval while in high-performance mode, in milliseconds
    /// (default: 5000). The common case, so polling takes it easy.
    pub poll_high_power_ms: u64,

    /// Target GPU as shown by `nvidia-settings -q gpus` (default: 0).
    pub gpu_id: u32,

    /// Path to the nvidia-settings binary.
    /// If unset, searches PATH.
    pub nvidia_settings_path: Option<PathBuf>,

    /// Dry run mode: log mode-switch commands instead of executing.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_threshold_ms: 20_000,
            poll_low_power_ms: 10,
            poll_high_power_ms: 5_000,
            gpu_id: 0,
            nvidia_settings_path: None,
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from the default path, or return defaults if not found.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load(p);
        }

        // Try default config path
        if let Some(config_dir) = dirs::config_dir() {
            let default_path = config_dir.join("nvpowermizerd").join("config.toml");
            if default_path.exists() {
                return Self::load(&default_path);
            }
        }

        Ok(Self::default())
    }

    /// Controller tunables derived from this configuration.
    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            idle_threshold: Duration::from_millis(self.idle_threshold_ms),
            poll_low_power: Duration::from_millis(self.poll_low_power_ms),
            poll_high_power: Duration::from_millis(self.poll_high_power_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.idle_threshold_ms, 20_000);
        assert_eq!(config.poll_low_power_ms, 10);
        assert_eq!(config.poll_high_power_ms, 5_000);
        assert_eq!(config.gpu_id, 0);
        assert!(config.nvidia_settings_path.is_none());
        assert!(!config.dry_run);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            idle_threshold_ms = 30000
            poll_low_power_ms = 50
            poll_high_power_ms = 10000
            gpu_id = 2
            nvidia_settings_path = "/opt/nvidia/bin/nvidia-settings"
            dry_run = true
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.idle_threshold_ms, 30_000);
        assert_eq!(config.poll_low_power_ms, 50);
        assert_eq!(config.poll_high_power_ms, 10_000);
        assert_eq!(config.gpu_id, 2);
        assert_eq!(
            config.nvidia_settings_path,
            Some(PathBuf::from("/opt/nvidia/bin/nvidia-settings"))
        );
        assert!(config.dry_run);
    }

    #[test]
    fn test_parse_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("gpu_id = 1").unwrap();
        assert_eq!(config.gpu_id, 1);
        assert_eq!(config.idle_threshold_ms, 20_000);
        assert_eq!(config.poll_high_power_ms, 5_000);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "idle_threshold_ms = 15000").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.idle_threshold_ms, 15_000);
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        assert!(Config::load(Path::new("/nonexistent/config.toml")).is_err());
    }

    #[test]
    fn test_controller_conversion() {
        let config = Config::default();
        let controller = config.controller();
        assert_eq!(controller.idle_threshold, Duration::from_millis(20_000));
        assert_eq!(controller.poll_low_power, Duration::from_millis(10));
        assert_eq!(controller.poll_high_power, Duration::from_millis(5_000));
    }
}
