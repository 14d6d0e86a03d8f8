//! Exporter settings, loadable from a JSON file and overridden by CLI flags

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::ReplayArgs;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportConfig {
    /// Directory for rotating log/metric files; stdout when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Files kept per sink, including the active one.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Rotate once a file would grow past this many bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Seconds between correlation cleanup sweeps.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// Bounded queue length per source feed.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_max_files() -> usize {
    5
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            max_files: default_max_files(),
            max_file_size: default_max_file_size(),
            cleanup_interval_secs: default_cleanup_interval(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl ExportConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ExportConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Merge CLI args into config (CLI takes precedence).
    pub fn merge_cli(&mut self, cli: &ReplayArgs) {
        if cli.output_dir.is_some() {
            self.output_dir.clone_from(&cli.output_dir);
        }
        if let Some(max_files) = cli.max_files {
            self.max_files = max_files;
        }
        if let Some(max_file_size) = cli.max_file_size {
            self.max_file_size = max_file_size;
        }
        if let Some(interval) = cli.cleanup_interval {
            self.cleanup_interval_secs = interval;
        }
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: ExportConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ExportConfig::default());
        assert_eq!(config.max_files, 5);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config: ExportConfig =
            serde_json::from_str(r#"{"output_dir":"/var/log/wirescope","max_files":2}"#).unwrap();
        let cli = ReplayArgs {
            capture: PathBuf::from("capture.jsonl"),
            config: None,
            output_dir: None,
            max_files: Some(9),
            max_file_size: None,
            cleanup_interval: Some(0),
        };
        config.merge_cli(&cli);

        assert_eq!(config.output_dir, Some(PathBuf::from("/var/log/wirescope")));
        assert_eq!(config.max_files, 9);
        assert_eq!(config.max_file_size, default_max_file_size());
        // Zero would spin the cleanup thread
        assert_eq!(config.cleanup_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("export.json");
        fs::write(&path, r#"{"channel_capacity": 16}"#).unwrap();
        assert_eq!(ExportConfig::from_file(&path).unwrap().channel_capacity, 16);

        fs::write(&path, "not json").unwrap();
        assert!(ExportConfig::from_file(&path).is_err());
    }
}
