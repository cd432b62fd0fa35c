// ── Core identity types ──
//
// NetworkKey identifies an entry for its whole lifetime; NetworkHandle
// identifies one L3 network instance that the entry may be bound to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::security::SecurityType;

// ── NetworkKey ──────────────────────────────────────────────────────

/// Stable, unique key for a Wi-Fi network.
///
/// Derived from SSID + security for ordinary networks, or from the
/// provider FQDN for subscription (Passpoint) profiles. Two entries are
/// equal iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkKey(String);

impl NetworkKey {
    /// Key for an SSID + security pair, e.g. `SSID:Home;PSK`.
    pub fn standard(ssid: &str, security: SecurityType) -> Self {
        Self(format!("SSID:{ssid};{security}"))
    }

    /// Key for a subscription profile, e.g. `PASSPOINT:example.com`.
    pub fn passpoint(fqdn: &str) -> Self {
        Self(format!("PASSPOINT:{}", fqdn.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NetworkKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl From<&str> for NetworkKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for NetworkKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── NetworkHandle ───────────────────────────────────────────────────

/// Opaque handle of one L3 network, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkHandle(pub u64);

impl fmt::Display for NetworkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net#{}", self.0)
    }
}
