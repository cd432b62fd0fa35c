//! Trace files: a scripted entry, its collaborators, and a list of steps.
//!
//! ```yaml
//! entry: { kind: standard, ssid: Home, security: PSK }
//! manager: { connect: accept }
//! steps:
//!   - op: connect
//!   - op: capabilities
//!     network: 100
//!     caps: { transports: [wifi], link_info: { ssid: Home, rssi: -50, is_primary: true } }
//!   - op: advance
//!     ms: 500
//! ```

use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use wifitrack_core::{
    ActionListener, ConfigResolver, DetailedState, EntryKind, LinkInfo,
    LinkProperties, NetworkCapabilities, NetworkHandle, NetworkKey, SecurityDescriptor,
    SimCredential, WifiManager, default_signal_level,
};

use crate::cli::TraceFormat;
use crate::error::CliError;

// ── Trace model ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Trace {
    pub entry: EntryKind,
    #[serde(default)]
    pub resolver: ResolverScript,
    #[serde(default)]
    pub manager: ManagerScript,
    /// Applied before the first step.
    #[serde(default)]
    pub known_security: Vec<SecurityDescriptor>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Canned answers for the connect pre-checks.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverScript {
    pub saved: bool,
    pub sim: SimCredential,
}

impl Default for ResolverScript {
    fn default() -> Self {
        Self {
            saved: true,
            sim: SimCredential::NotRequired,
        }
    }
}

/// How the scripted manager answers each kind of request.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerScript {
    pub connect: Reply,
    pub disconnect: Reply,
    pub forget: Reply,
    pub sign_in: Reply,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    #[default]
    Accept,
    Reject,
    /// Never answer; the request stays pending.
    Ignore,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    LinkInfo {
        info: LinkInfo,
        state: DetailedState,
    },
    Capabilities {
        network: NetworkHandle,
        caps: NetworkCapabilities,
    },
    LinkProperties {
        network: NetworkHandle,
        properties: LinkProperties,
    },
    NetworkLost {
        network: NetworkHandle,
    },
    DefaultCapabilities {
        network: NetworkHandle,
        caps: NetworkCapabilities,
    },
    DefaultNetworkLost,
    ConnectivityReport {
        network: NetworkHandle,
        #[serde(default)]
        validated: bool,
    },
    KnownSecurity {
        descriptors: Vec<SecurityDescriptor>,
    },
    Connect,
    Disconnect,
    Forget,
    SignIn,
    /// Let virtual time pass.
    Advance {
        ms: u64,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkInfo { state, .. } => write!(f, "link_info {state}"),
            Self::Capabilities { network, .. } => write!(f, "capabilities {network}"),
            Self::LinkProperties { network, .. } => write!(f, "link_properties {network}"),
            Self::NetworkLost { network } => write!(f, "network_lost {network}"),
            Self::DefaultCapabilities { network, .. } => {
                write!(f, "default_capabilities {network}")
            }
            Self::DefaultNetworkLost => f.write_str("default_network_lost"),
            Self::ConnectivityReport { network, validated } => {
                let verdict = if *validated { "validated" } else { "unvalidated" };
                write!(f, "connectivity_report {network} {verdict}")
            }
            Self::KnownSecurity { descriptors } => {
                write!(f, "known_security x{}", descriptors.len())
            }
            Self::Connect => f.write_str("connect"),
            Self::Disconnect => f.write_str("disconnect"),
            Self::Forget => f.write_str("forget"),
            Self::SignIn => f.write_str("sign_in"),
            Self::Advance { ms } => write!(f, "advance {ms}ms"),
        }
    }
}

// ── Loading ─────────────────────────────────────────────────────────

/// Read and parse a trace. `-` reads stdin.
pub fn load(path: &Path, format: Option<TraceFormat>) -> Result<Trace, CliError> {
    let display = path.display().to_string();
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| CliError::TraceUnreadable {
                path: display.clone(),
                source,
            })?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|source| CliError::TraceUnreadable {
            path: display.clone(),
            source,
        })?
    };

    let format = format.unwrap_or_else(|| infer_format(path));
    parse(&raw, format).map_err(|reason| CliError::TraceInvalid {
        path: display,
        reason,
    })
}

pub fn parse(raw: &str, format: TraceFormat) -> Result<Trace, String> {
    match format {
        TraceFormat::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
        TraceFormat::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
    }
}

fn infer_format(path: &Path) -> TraceFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => TraceFormat::Json,
        _ => TraceFormat::Yaml,
    }
}

// ── Scripted collaborators ──────────────────────────────────────────

/// Answers every request synchronously from its script.
#[derive(Debug)]
pub struct ScriptedManager {
    script: ManagerScript,
}

impl ScriptedManager {
    pub fn new(script: ManagerScript) -> Self {
        Self { script }
    }

    fn answer(reply: Reply, listener: ActionListener) {
        match reply {
            Reply::Accept => listener.succeeded(),
            Reply::Reject => listener.failed(),
            Reply::Ignore => tracing::debug!(kind = %listener.kind(), "request left unanswered"),
        }
    }
}

impl WifiManager for ScriptedManager {
    fn calculate_signal_level(&self, rssi: i32) -> i32 {
        default_signal_level(rssi)
    }

    fn connect(&self, _key: &NetworkKey, listener: ActionListener) {
        Self::answer(self.script.connect, listener);
    }

    fn disconnect(&self, _key: &NetworkKey, listener: ActionListener) {
        Self::answer(self.script.disconnect, listener);
    }

    fn forget(&self, _key: &NetworkKey, listener: ActionListener) {
        Self::answer(self.script.forget, listener);
    }

    fn start_captive_portal_sign_in(&self, _network: NetworkHandle, listener: ActionListener) {
        Self::answer(self.script.sign_in, listener);
    }
}

impl ConfigResolver for ResolverScript {
    fn has_saved_config(&self, _key: &NetworkKey) -> bool {
        self.saved
    }

    fn sim_credential(&self, _key: &NetworkKey) -> SimCredential {
        self.sim
    }
}
