use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Global macbroom configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Paths to exclude from scanning (glob or `dir/**` patterns)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Minimum size for the large & old files scanner, in MB
    #[serde(default = "default_large_file_min_mb")]
    pub large_file_min_mb: u64,

    /// Minimum age for the large & old files scanner, in days
    #[serde(default = "default_large_file_max_age_days")]
    pub large_file_max_age_days: u32,

    /// Directories searched for large & old files (~ expanded)
    #[serde(default = "default_large_file_roots")]
    pub large_file_roots: Vec<String>,

    /// Time budget for one external command
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Time budget for one whole scan
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,

    /// Time budget for removing the confirmed targets of one clean
    #[serde(default = "default_clean_timeout_secs")]
    pub clean_timeout_secs: u64,

    /// Run independent scanners concurrently
    #[serde(default)]
    pub parallel_scan: bool,
}

fn default_large_file_min_mb() -> u64 {
    100
}
fn default_large_file_max_age_days() -> u32 {
    180
}
fn default_large_file_roots() -> Vec<String> {
    ["~/Downloads", "~/Documents", "~/Desktop", "~/Movies"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_command_timeout_secs() -> u64 {
    30
}
fn default_scan_timeout_secs() -> u64 {
    600
}
fn default_clean_timeout_secs() -> u64 {
    1800
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            large_file_min_mb: default_large_file_min_mb(),
            large_file_max_age_days: default_large_file_max_age_days(),
            large_file_roots: default_large_file_roots(),
            command_timeout_secs: default_command_timeout_secs(),
            scan_timeout_secs: default_scan_timeout_secs(),
            clean_timeout_secs: default_clean_timeout_secs(),
            parallel_scan: false,
        }
    }
}

impl Config {
    /// Get the macbroom data directory (~/.macbroom)
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".macbroom")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Single-slot store for the most recent scan snapshot
    pub fn snapshot_path() -> PathBuf {
        Self::data_dir().join("last_scan.json")
    }

    /// Append-only cleanup history ledger
    pub fn history_path() -> PathBuf {
        Self::data_dir().join("history.jsonl")
    }

    /// Load config from file, or use defaults if it does not exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config dir: {}", dir.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Set a single key from its string form (used by `config set`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "large_file_min_mb" => self.large_file_min_mb = value.parse()?,
            "large_file_max_age_days" => self.large_file_max_age_days = value.parse()?,
            "command_timeout_secs" => self.command_timeout_secs = value.parse()?,
            "scan_timeout_secs" => self.scan_timeout_secs = value.parse()?,
            "clean_timeout_secs" => self.clean_timeout_secs = value.parse()?,
            "parallel_scan" => self.parallel_scan = value.parse()?,
            "exclude" => {
                self.exclude = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }
            "large_file_roots" => {
                self.large_file_roots = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }
            _ => anyhow::bail!("Unknown config key '{}'", key),
        }
        Ok(())
    }

    pub fn large_file_min_bytes(&self) -> u64 {
        self.large_file_min_mb * 1024 * 1024
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn clean_timeout(&self) -> Duration {
        Duration::from_secs(self.clean_timeout_secs)
    }
}
