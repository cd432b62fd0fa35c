// ── Core error types ──
//
// State aggregation never fails: mismatched or partial signals are dropped
// silently and action failures surface through action callbacks. These
// errors cover the infrastructure around an entry only.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Runtime errors ───────────────────────────────────────────────
    #[error("No tokio runtime available to host the callback context")]
    NoRuntime,

    #[error("Callback context has shut down")]
    CallbackContextClosed,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}
