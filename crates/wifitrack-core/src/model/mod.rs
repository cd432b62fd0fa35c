// ── Domain model ──
//
// Plain data types shared by the entry state machine, the action
// coordinator, and consumers.

pub mod identity;
pub mod link;
pub mod security;
pub mod snapshot;

pub use identity::{NetworkHandle, NetworkKey};
pub use link::{
    Capability, ConnectivityReport, DetailedState, LinkAddress, LinkInfo, LinkProperties,
    NetworkCapabilities, RouteInfo, Transport, WifiStandard,
};
pub use security::{SecurityDescriptor, SecurityType, classify, classify_all};
pub use snapshot::{ConnectedState, ConnectionSnapshot, FrequencyBand};
