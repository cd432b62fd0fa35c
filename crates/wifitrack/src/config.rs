//! CLI configuration: thin wrapper around `wifitrack_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (`--config`, `--output`, `--color`).

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use wifitrack_core::EntryConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use wifitrack_config::{Config, config_path, load_config_from, save_config_to};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Config file in effect: `--config` / `WIFITRACK_CONFIG`, else the platform path.
pub fn resolved_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config_from(&resolved_path(global))?)
}

/// Flag > config > table.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    global
        .output
        .or_else(|| OutputFormat::from_str(&config.defaults.output, true).ok())
        .unwrap_or(OutputFormat::Table)
}

/// Flag > config > auto.
pub fn color_mode(global: &GlobalOpts, config: &Config) -> ColorMode {
    global
        .color
        .or_else(|| ColorMode::from_str(&config.defaults.color, true).ok())
        .unwrap_or(ColorMode::Auto)
}

/// Entry configuration with an optional `--connect-timeout-ms` override.
pub fn entry_config(config: &Config, timeout_override_ms: Option<u64>) -> Result<EntryConfig, CliError> {
    let mut entry = config.entry_config()?;
    if let Some(ms) = timeout_override_ms {
        if ms == 0 {
            return Err(CliError::Validation {
                field: "--connect-timeout-ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        entry.connect_timeout = Duration::from_millis(ms);
    }
    Ok(entry)
}
