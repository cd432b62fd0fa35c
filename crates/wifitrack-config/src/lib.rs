//! Shared configuration for wifitrack tools.
//!
//! TOML defaults merged with `WIFITRACK_*` environment overrides, and
//! translation to `wifitrack_core::EntryConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wifitrack_core::{DEFAULT_CONNECT_TIMEOUT, EntryConfig};

/// Environment variable prefix. Nested keys use `__`, e.g.
/// `WIFITRACK_DEFAULTS__CONNECT_TIMEOUT_MS`.
pub const ENV_PREFIX: &str = "WIFITRACK_";

const OUTPUT_FORMATS: &[&str] = &["table", "json", "yaml", "plain"];
const COLOR_MODES: &[&str] = &["auto", "always", "never"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Output format: "table", "json", "yaml" or "plain".
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: "auto", "always" or "never".
    #[serde(default = "default_color")]
    pub color: String,

    /// Connect timeout in milliseconds, measured from manager acceptance.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_connect_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_CONNECT_TIMEOUT.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    /// Reject values no consumer could act on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = &self.defaults;
        if d.connect_timeout_ms == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.connect_timeout_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if !OUTPUT_FORMATS.contains(&d.output.as_str()) {
            return Err(ConfigError::Validation {
                field: "defaults.output".into(),
                reason: format!("expected one of {}, got '{}'", OUTPUT_FORMATS.join(", "), d.output),
            });
        }
        if !COLOR_MODES.contains(&d.color.as_str()) {
            return Err(ConfigError::Validation {
                field: "defaults.color".into(),
                reason: format!("expected one of {}, got '{}'", COLOR_MODES.join(", "), d.color),
            });
        }
        Ok(())
    }

    /// Build the core entry configuration.
    pub fn entry_config(&self) -> Result<EntryConfig, ConfigError> {
        self.validate()?;
        Ok(EntryConfig {
            connect_timeout: Duration::from_millis(self.defaults.connect_timeout_ms),
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("tech", "hyperbliss", "wifitrack").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("wifitrack");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file contributes nothing.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_core() {
        let cfg = Config::default();
        assert_eq!(cfg.defaults.connect_timeout_ms, 10_000);
        assert_eq!(cfg.entry_config().unwrap(), EntryConfig::default());
    }

    #[test]
    fn file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [defaults]
                output = "json"
                connect_timeout_ms = 5000
                "#,
            )?;
            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.defaults.output, "json");
            assert_eq!(cfg.defaults.color, "auto");
            assert_eq!(cfg.defaults.connect_timeout_ms, 5000);

            jail.set_env("WIFITRACK_DEFAULTS__CONNECT_TIMEOUT_MS", "2500");
            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(
                cfg.entry_config().map_err(|e| e.to_string())?.connect_timeout,
                Duration::from_millis(2500)
            );
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_| {
            let cfg = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg, Config::default());
            Ok(())
        });
    }

    #[test]
    fn rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[defaults]\nconnect_timeout_ms = 0\n")?;
            let err = load_config_from(Path::new("config.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "defaults.connect_timeout_ms"));

            jail.create_file("config.toml", "[defaults]\noutput = \"xml\"\n")?;
            let err = load_config_from(Path::new("config.toml")).unwrap_err();
            assert!(err.to_string().contains("defaults.output"));
            Ok(())
        });
    }

    #[test]
    fn save_then_load() {
        // Inside a jail so env overrides set by other tests cannot leak in.
        Jail::expect_with(|_| {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("config.toml");
            let cfg = Config {
                defaults: Defaults {
                    output: "yaml".into(),
                    color: "never".into(),
                    connect_timeout_ms: 1234,
                },
            };
            save_config_to(&cfg, &path).unwrap();
            let written = std::fs::read_to_string(&path).unwrap();
            assert!(written.contains("connect_timeout_ms = 1234"));
            assert_eq!(load_config_from(&path).unwrap(), cfg);
            Ok(())
        });
    }
}
