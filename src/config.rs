//! Writer tuning loaded from an optional TOML file.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Tuning knobs for the writer, loaded from `~/.config/dlsink/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Minimum interval between progress emissions, in milliseconds.
    /// Terminal notifications are exempt.
    pub progress_interval_ms: u64,
    /// Capacity of the observer delivery channel; progress updates beyond
    /// it are dropped, terminal events wait for space.
    pub observer_channel_capacity: usize,
    /// fsync the temp file before the finalize rename.
    pub sync_on_finalize: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 250,
            observer_channel_capacity: 32,
            sync_on_finalize: true,
        }
    }
}

impl WriterConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlsink")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<WriterConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = WriterConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: WriterConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = WriterConfig::default();
        assert_eq!(cfg.progress_interval_ms, 250);
        assert_eq!(cfg.observer_channel_capacity, 32);
        assert!(cfg.sync_on_finalize);
        assert_eq!(cfg.progress_interval(), Duration::from_millis(250));
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = WriterConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: WriterConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.progress_interval_ms, cfg.progress_interval_ms);
        assert_eq!(parsed.observer_channel_capacity, cfg.observer_channel_capacity);
        assert_eq!(parsed.sync_on_finalize, cfg.sync_on_finalize);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            progress_interval_ms = 50
            observer_channel_capacity = 4
            sync_on_finalize = false
        "#;
        let cfg: WriterConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.progress_interval_ms, 50);
        assert_eq!(cfg.observer_channel_capacity, 4);
        assert!(!cfg.sync_on_finalize);
    }
}
