//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{DdsError, Result};

/// Full drive_dash configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub alerts: AlertConfig,
    pub navigator: NavigatorConfig,
    pub store: StoreConfig,
    pub paths: PathsConfig,
}

/// Alert-engine polling and threshold knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertConfig {
    /// Fixed poll period for drive snapshots, in seconds.
    pub poll_interval_secs: u64,
    /// Threshold assumed for drives without an explicit entry.
    pub default_threshold_pct: f64,
    /// Width of the warning band below each threshold; also governs when a
    /// dismissal expires.
    pub hysteresis_pct: f64,
}

/// Move-destination navigator knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Window distinguishing a single activation from a double one.
    pub debounce_ms: u64,
}

/// Which key-value store implementation backs thresholds and dismissals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One JSON file per key under `paths.store_dir`.
    #[default]
    File,
    /// Single database file at `paths.sqlite_db` (feature `sqlite`).
    Sqlite,
}

/// Persistence knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

/// Filesystem paths used by drive_dash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    /// Directory for the per-key JSON store.
    pub store_dir: PathBuf,
    /// SQLite store database (feature `sqlite`).
    pub sqlite_db: PathBuf,
    /// Append-only JSONL notification log.
    pub jsonl_log: PathBuf,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            default_threshold_pct: 80.0,
            hysteresis_pct: 10.0,
        }
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[DDS-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("ddash").join("config.toml");
        let data = home_dir.join(".local").join("share").join("ddash");
        Self {
            config_file: cfg,
            store_dir: data.join("store"),
            sqlite_db: data.join("store.sqlite3"),
            jsonl_log: data.join("events.jsonl"),
        }
    }
}

impl AlertConfig {
    /// Poll period as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl NavigatorConfig {
    /// Debounce window as a `Duration`.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf)
                .map_err(|source| DdsError::io(&path_buf, source))?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(DdsError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        set_env_u64(
            "DDASH_ALERTS_POLL_INTERVAL_SECS",
            &mut self.alerts.poll_interval_secs,
        )?;
        set_env_f64(
            "DDASH_ALERTS_DEFAULT_THRESHOLD_PCT",
            &mut self.alerts.default_threshold_pct,
        )?;
        set_env_f64(
            "DDASH_ALERTS_HYSTERESIS_PCT",
            &mut self.alerts.hysteresis_pct,
        )?;
        set_env_u64("DDASH_NAVIGATOR_DEBOUNCE_MS", &mut self.navigator.debounce_ms)?;
        if let Some(raw) = env_var("DDASH_STORE_BACKEND") {
            self.store.backend = match raw.as_str() {
                "file" => StoreBackend::File,
                "sqlite" => StoreBackend::Sqlite,
                other => {
                    return Err(DdsError::InvalidConfig {
                        details: format!(
                            "DDASH_STORE_BACKEND must be \"file\" or \"sqlite\", got {other:?}"
                        ),
                    })
                }
            };
        }
        if let Some(raw) = env_var("DDASH_PATHS_STORE_DIR") {
            self.paths.store_dir = PathBuf::from(raw);
        }
        if let Some(raw) = env_var("DDASH_PATHS_SQLITE_DB") {
            self.paths.sqlite_db = PathBuf::from(raw);
        }
        if let Some(raw) = env_var("DDASH_PATHS_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Validate cross-field invariants.
    pub fn validate(&self) -> Result<()> {
        if self.alerts.poll_interval_secs == 0 {
            return Err(DdsError::InvalidConfig {
                details: "alerts.poll_interval_secs must be > 0".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&self.alerts.default_threshold_pct)
            || !self.alerts.default_threshold_pct.is_finite()
        {
            return Err(DdsError::InvalidConfig {
                details: format!(
                    "alerts.default_threshold_pct must be within [0, 100], got {}",
                    self.alerts.default_threshold_pct
                ),
            });
        }
        if !(0.0..100.0).contains(&self.alerts.hysteresis_pct)
            || !self.alerts.hysteresis_pct.is_finite()
        {
            return Err(DdsError::InvalidConfig {
                details: format!(
                    "alerts.hysteresis_pct must be within [0, 100), got {}",
                    self.alerts.hysteresis_pct
                ),
            });
        }
        if self.navigator.debounce_ms == 0 {
            return Err(DdsError::InvalidConfig {
                details: "navigator.debounce_ms must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn set_env_u64(name: &str, target: &mut u64) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *target = raw.parse::<u64>().map_err(|err| DdsError::InvalidConfig {
            details: format!("{name} must be an unsigned integer: {err}"),
        })?;
    }
    Ok(())
}

fn set_env_f64(name: &str, target: &mut f64) -> Result<()> {
    if let Some(raw) = env_var(name) {
        *target = raw.parse::<f64>().map_err(|err| DdsError::InvalidConfig {
            details: format!("{name} must be a number: {err}"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard_contract() {
        let cfg = Config::default();
        assert_eq!(cfg.alerts.poll_interval_secs, 60);
        assert!((cfg.alerts.default_threshold_pct - 80.0).abs() < f64::EPSILON);
        assert!((cfg.alerts.hysteresis_pct - 10.0).abs() < f64::EPSILON);
        assert_eq!(cfg.navigator.debounce_ms, 300);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_explicit_missing_path_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/ddash.toml"))).unwrap_err();
        assert_eq!(err.code(), "DDS-1002");
    }

    #[test]
    fn load_parses_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[alerts]\npoll_interval_secs = 15\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.alerts.poll_interval_secs, 15);
        // Unspecified sections fall back to defaults.
        assert_eq!(cfg.navigator.debounce_ms, 300);
    }

    #[test]
    fn validate_rejects_out_of_range_defaults() {
        let mut cfg = Config::default();
        cfg.alerts.default_threshold_pct = 120.0;
        assert_eq!(cfg.validate().unwrap_err().code(), "DDS-1001");

        let mut cfg = Config::default();
        cfg.alerts.hysteresis_pct = -1.0;
        assert_eq!(cfg.validate().unwrap_err().code(), "DDS-1001");

        let mut cfg = Config::default();
        cfg.navigator.debounce_ms = 0;
        assert_eq!(cfg.validate().unwrap_err().code(), "DDS-1001");
    }

    #[test]
    fn store_backend_defaults_to_file_and_parses_from_toml() {
        assert_eq!(Config::default().store.backend, StoreBackend::File);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[store]\nbackend = \"sqlite\"\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn config_roundtrip_toml() {
        let cfg = Config::default();
        let raw = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&raw).unwrap();
        assert_eq!(cfg, parsed);
    }
}
