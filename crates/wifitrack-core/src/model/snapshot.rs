// ── Connection snapshot ──
//
// Point-in-time view of a connected network. Built up inside the entry
// under its lock and only ever handed out as a finished copy.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};
use strum::Display;

use super::link::{LinkInfo, LinkProperties, WifiStandard};

/// Connection state of an entry, always derived from the signals it holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectedState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyBand {
    #[strum(to_string = "2.4 GHz")]
    Band2_4Ghz,
    #[strum(to_string = "5 GHz")]
    Band5Ghz,
    #[strum(to_string = "6 GHz")]
    Band6Ghz,
    #[strum(to_string = "60 GHz")]
    Band60Ghz,
    #[default]
    #[strum(to_string = "unknown")]
    Unknown,
}

impl FrequencyBand {
    pub fn from_mhz(mhz: u32) -> Self {
        match mhz {
            2400..=2500 => Self::Band2_4Ghz,
            4900..=5900 => Self::Band5Ghz,
            5925..=7125 => Self::Band6Ghz,
            58320..=70200 => Self::Band60Ghz,
            _ => Self::Unknown,
        }
    }
}

/// Immutable view of link and network state while connected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub frequency_band: FrequencyBand,
    pub frequency_mhz: u32,
    pub link_speed_mbps: u32,
    pub wifi_standard: WifiStandard,
    pub ipv4_address: Option<String>,
    pub subnet_mask: Option<String>,
    pub gateway_address: Option<String>,
    pub ipv6_addresses: Vec<String>,
    pub dns_servers: Vec<String>,
    pub validated: bool,
    pub is_default_network: bool,
}

impl ConnectionSnapshot {
    /// Overwrite the radio fields from the current link info.
    pub(crate) fn apply_link_info(&mut self, info: &LinkInfo) {
        self.frequency_mhz = info.frequency_mhz;
        self.frequency_band = FrequencyBand::from_mhz(info.frequency_mhz);
        self.link_speed_mbps = info.link_speed_mbps;
        self.wifi_standard = info.wifi_standard;
    }

    /// Replace every addressing field from one set of link properties.
    ///
    /// The last IPv4 link address wins; the gateway is taken from the first
    /// IPv4 default route that has one.
    pub(crate) fn apply_link_properties(&mut self, props: &LinkProperties) {
        let mut ipv4_address = None;
        let mut subnet_mask = None;
        let mut ipv6_addresses = Vec::new();

        for addr in &props.link_addresses {
            match addr.address {
                IpAddr::V4(v4) => {
                    ipv4_address = Some(v4.to_string());
                    subnet_mask = prefix_to_mask(addr.prefix_len).map(|m| m.to_string());
                }
                IpAddr::V6(v6) => ipv6_addresses.push(v6.to_string()),
            }
        }

        let gateway_address = props
            .routes
            .iter()
            .filter(|r| r.is_default_route() && r.destination.is_ipv4())
            .find_map(|r| r.gateway)
            .map(|gw| gw.to_string());

        self.ipv4_address = ipv4_address;
        self.subnet_mask = subnet_mask;
        self.ipv6_addresses = ipv6_addresses;
        self.gateway_address = gateway_address;
        self.dns_servers = props.dns_servers.iter().map(ToString::to_string).collect();
    }
}

/// Dotted-quad netmask for an IPv4 prefix length; `None` when out of range.
fn prefix_to_mask(prefix_len: u8) -> Option<Ipv4Addr> {
    match prefix_len {
        0 => Some(Ipv4Addr::UNSPECIFIED),
        1..=32 => Some(Ipv4Addr::from(u32::MAX << (32 - u32::from(prefix_len)))),
        _ => None,
    }
}
