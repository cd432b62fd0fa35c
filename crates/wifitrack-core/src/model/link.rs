// ── Link-layer and L3 signal types ──
//
// Plain data delivered by the platform event sources. Every field that the
// platform may omit is optional; absence degrades to "no information".

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::identity::NetworkHandle;
use super::security::SecurityDescriptor;

/// Legacy per-interface detailed connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetailedState {
    Idle,
    Scanning,
    Connecting,
    Authenticating,
    ObtainingIpAddr,
    VerifyingPoorLink,
    CaptivePortalCheck,
    Connected,
    Suspended,
    Disconnecting,
    Disconnected,
    Failed,
    Blocked,
}

impl DetailedState {
    /// Whether this detailed state means the link is coming up.
    pub fn is_connecting(self) -> bool {
        matches!(
            self,
            Self::Scanning
                | Self::Connecting
                | Self::Authenticating
                | Self::ObtainingIpAddr
                | Self::VerifyingPoorLink
                | Self::CaptivePortalCheck
                | Self::Connected
        )
    }
}

/// 802.11 generation of the current association.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WifiStandard {
    #[default]
    Unknown,
    Legacy,
    #[strum(to_string = "11n")]
    #[serde(rename = "11n")]
    N,
    #[strum(to_string = "11ac")]
    #[serde(rename = "11ac")]
    Ac,
    #[strum(to_string = "11ad")]
    #[serde(rename = "11ad")]
    Ad,
    #[strum(to_string = "11ax")]
    #[serde(rename = "11ax")]
    Ax,
    #[strum(to_string = "11be")]
    #[serde(rename = "11be")]
    Be,
}

/// Link-layer information for the current association.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkInfo {
    pub ssid: Option<String>,
    pub bssid: Option<String>,
    /// Received signal strength in dBm; `None` when the platform reports it as invalid.
    pub rssi: Option<i32>,
    pub frequency_mhz: u32,
    pub link_speed_mbps: u32,
    pub wifi_standard: WifiStandard,
    pub security: Option<SecurityDescriptor>,
    pub is_primary: bool,
    pub passpoint_fqdn: Option<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Transport {
    Wifi,
    Cellular,
    Ethernet,
    Vpn,
    Bluetooth,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    Internet,
    Validated,
    CaptivePortal,
    NotMetered,
    /// Paid OEM network: an allowed secondary connection.
    OemPaid,
    /// Private OEM network: an allowed secondary connection.
    OemPrivate,
}

/// L3 capabilities of a network. `link_info` carries the Wi-Fi transport info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkCapabilities {
    pub transports: BTreeSet<Transport>,
    pub capabilities: BTreeSet<Capability>,
    pub link_info: Option<LinkInfo>,
}

impl NetworkCapabilities {
    pub fn has_transport(&self, transport: Transport) -> bool {
        self.transports.contains(&transport)
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn is_oem(&self) -> bool {
        self.has_capability(Capability::OemPaid) || self.has_capability(Capability::OemPrivate)
    }

    // ── Builders (tests, trace scripts) ──

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transports.insert(transport);
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    pub fn with_link_info(mut self, info: LinkInfo) -> Self {
        self.link_info = Some(info);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAddress {
    pub address: IpAddr,
    pub prefix_len: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub destination: IpAddr,
    pub prefix_len: u8,
    pub gateway: Option<IpAddr>,
}

impl RouteInfo {
    pub fn is_default_route(&self) -> bool {
        self.prefix_len == 0
    }
}

/// Addressing, routes and resolvers of a network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkProperties {
    pub link_addresses: Vec<LinkAddress>,
    pub routes: Vec<RouteInfo>,
    pub dns_servers: Vec<IpAddr>,
}

/// Connectivity-diagnostics report for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    pub network: NetworkHandle,
    #[serde(default)]
    pub validated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_detailed_state_without_capabilities_is_connecting() {
        assert!(DetailedState::Connected.is_connecting());
        assert!(DetailedState::CaptivePortalCheck.is_connecting());
        assert!(!DetailedState::Disconnecting.is_connecting());
        assert!(!DetailedState::Idle.is_connecting());
    }

    #[test]
    fn oem_capabilities() {
        let caps = NetworkCapabilities::default().with_capability(Capability::OemPaid);
        assert!(caps.is_oem());
        assert!(!NetworkCapabilities::default().is_oem());
    }
}
