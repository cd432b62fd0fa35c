// ── Entry kinds ──
//
// Closed set of network categories. Each kind knows its key, how to
// recognise its own link-layer info, and how to resolve security types.

use serde::{Deserialize, Serialize};

use crate::model::{LinkInfo, NetworkKey, SecurityType, classify};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    /// An SSID joined with one security family (saved, suggested, or scanned).
    Standard { ssid: String, security: SecurityType },
    /// A subscription profile identified by its provider FQDN.
    Passpoint {
        fqdn: String,
        #[serde(default)]
        friendly_name: Option<String>,
    },
}

impl EntryKind {
    pub fn key(&self) -> NetworkKey {
        match self {
            Self::Standard { ssid, security } => NetworkKey::standard(ssid, *security),
            Self::Passpoint { fqdn, .. } => NetworkKey::passpoint(fqdn),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Standard { ssid, .. } => ssid,
            Self::Passpoint {
                fqdn,
                friendly_name,
            } => friendly_name.as_deref().unwrap_or(fqdn),
        }
    }

    pub fn is_subscription(&self) -> bool {
        matches!(self, Self::Passpoint { .. })
    }

    /// Whether `info` describes a connection to this network.
    pub fn matches(&self, info: &LinkInfo) -> bool {
        match self {
            Self::Standard { ssid, security } => {
                info.ssid.as_deref() == Some(ssid.as_str())
                    && info
                        .security
                        .is_none_or(|raw| same_family(classify(raw), *security))
            }
            Self::Passpoint { fqdn, .. } => info
                .passpoint_fqdn
                .as_deref()
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(fqdn)),
        }
    }

    /// Security types given what is known from scans/configs and the
    /// current link info (if any).
    pub(crate) fn resolve_security(
        &self,
        known: &[SecurityType],
        link: Option<&LinkInfo>,
    ) -> Vec<SecurityType> {
        match self {
            Self::Standard { .. } => match link.and_then(|info| info.security) {
                Some(raw) => vec![classify(raw)],
                None => known.to_vec(),
            },
            Self::Passpoint { .. } if known.is_empty() => vec![SecurityType::Eap],
            Self::Passpoint { .. } => known.to_vec(),
        }
    }
}

/// Security types that may serve the same saved network (transition modes).
fn same_family(a: SecurityType, b: SecurityType) -> bool {
    fn family(ty: SecurityType) -> u8 {
        match ty {
            SecurityType::Open | SecurityType::Owe => 0,
            SecurityType::Wep => 1,
            SecurityType::Psk | SecurityType::Sae => 2,
            SecurityType::Eap | SecurityType::EapWpa3Enterprise | SecurityType::EapSuiteB => 3,
            SecurityType::WapiPsk => 4,
            SecurityType::WapiCert => 5,
        }
    }
    family(a) == family(b)
}
