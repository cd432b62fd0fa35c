// ── Runtime entry configuration ──
//
// Tuning for entries and their action coordinators. Never touches disk:
// `wifitrack-config` (or any consumer) builds an `EntryConfig` and hands it in.

use std::time::Duration;

use crate::error::CoreError;

/// How long an accepted connect may take to reach CONNECTED.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Configuration shared by every entry built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryConfig {
    /// Window after an accepted connect before it resolves as failure.
    pub connect_timeout: Duration,
}

impl EntryConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.connect_timeout.is_zero() {
            return Err(CoreError::Config {
                message: "connect_timeout must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}
