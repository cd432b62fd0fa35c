//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use wifitrack_config::ConfigError;
use wifitrack_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const TRACE: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Trace ────────────────────────────────────────────────────────
    #[error("Could not read trace file {path}")]
    #[diagnostic(code(wifitrack::trace_unreadable), help("Check the path, or pass `-` to read stdin."))]
    TraceUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid trace {path}: {reason}")]
    #[diagnostic(
        code(wifitrack::trace_invalid),
        help(
            "Traces hold an `entry`, optional `resolver` and `manager` sections,\n\
             and a list of `steps`, each tagged with `op`.\n\
             Try: wifitrack replay traces/connect.yaml"
        )
    )]
    TraceInvalid { path: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wifitrack::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists")]
    #[diagnostic(
        code(wifitrack::config_exists),
        help(
            "Expected to create: {path}\n\
             Re-run with --force to overwrite it."
        )
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(wifitrack::config),
        help("Inspect the resolved configuration with: wifitrack config show")
    )]
    Config(#[from] ConfigError),

    // ── Core ─────────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(wifitrack::core))]
    Core(#[from] CoreError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(wifitrack::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::TraceUnreadable { .. } | Self::TraceInvalid { .. } => exit_code::TRACE,
            Self::Validation { .. } => exit_code::USAGE,
            Self::ConfigExists { .. }
            | Self::Config(_)
            | Self::Core(CoreError::Config { .. }) => {
                exit_code::CONFIG
            }
            _ => exit_code::GENERAL,
        }
    }
}
