// ── Security classification ──
//
// Maps the platform's resolved security descriptor onto the closed set of
// categories the entry exposes. Pure and total: unknown codes become Open.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Raw security descriptor as reported by the link layer or a saved config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityDescriptor(pub i32);

impl SecurityDescriptor {
    pub const UNKNOWN: Self = Self(-1);
    pub const OPEN: Self = Self(0);
    pub const WEP: Self = Self(1);
    pub const PSK: Self = Self(2);
    pub const EAP: Self = Self(3);
    pub const SAE: Self = Self(4);
    pub const EAP_WPA3_ENTERPRISE_192_BIT: Self = Self(5);
    pub const OWE: Self = Self(6);
    pub const WAPI_PSK: Self = Self(7);
    pub const WAPI_CERT: Self = Self(8);
    pub const EAP_WPA3_ENTERPRISE: Self = Self(9);
    pub const OSEN: Self = Self(10);
    pub const PASSPOINT_R1_R2: Self = Self(11);
    pub const PASSPOINT_R3: Self = Self(12);
    pub const DPP: Self = Self(13);
}

/// Security category of a network.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SecurityType {
    Open,
    Owe,
    Wep,
    Psk,
    Sae,
    Eap,
    EapWpa3Enterprise,
    EapSuiteB,
    WapiPsk,
    WapiCert,
}

impl SecurityType {
    /// Networks that can be joined without any stored credential.
    pub fn is_open_like(self) -> bool {
        matches!(self, Self::Open | Self::Owe)
    }
}

/// Classify a raw descriptor. Unsupported descriptors fall back to `Open`.
pub fn classify(descriptor: SecurityDescriptor) -> SecurityType {
    match descriptor {
        SecurityDescriptor::OWE => SecurityType::Owe,
        SecurityDescriptor::WEP => SecurityType::Wep,
        SecurityDescriptor::PSK => SecurityType::Psk,
        SecurityDescriptor::SAE => SecurityType::Sae,
        SecurityDescriptor::EAP
        | SecurityDescriptor::PASSPOINT_R1_R2
        | SecurityDescriptor::PASSPOINT_R3 => SecurityType::Eap,
        SecurityDescriptor::EAP_WPA3_ENTERPRISE => SecurityType::EapWpa3Enterprise,
        SecurityDescriptor::EAP_WPA3_ENTERPRISE_192_BIT => SecurityType::EapSuiteB,
        SecurityDescriptor::WAPI_PSK => SecurityType::WapiPsk,
        SecurityDescriptor::WAPI_CERT => SecurityType::WapiCert,
        _ => SecurityType::Open,
    }
}

/// Classify a list of descriptors into an ordered, de-duplicated set.
pub fn classify_all(descriptors: &[SecurityDescriptor]) -> Vec<SecurityType> {
    let mut out: Vec<SecurityType> = Vec::with_capacity(descriptors.len());
    for ty in descriptors.iter().copied().map(classify) {
        if !out.contains(&ty) {
            out.push(ty);
        }
    }
    out
}
