// wifitrack-core: Per-network Wi-Fi entry state tracking.
//
// Aggregates link-layer info, network capabilities, link properties,
// connectivity reports and default-network status into one published view
// per network, and correlates user actions with later state transitions.

pub mod action;
pub mod collaborator;
pub mod config;
pub mod entry;
pub mod error;
pub mod model;
pub mod notify;

// ── Primary re-exports ──────────────────────────────────────────────
pub use action::{
    ActionCallback, ActionKind, ActionListener, ConnectCallback, ConnectStatus,
    DisconnectCallback, DisconnectStatus, ForgetCallback, ForgetStatus, SignInCallback,
    SignInStatus,
};
pub use collaborator::{ConfigResolver, SimCredential, WifiManager, default_signal_level};
pub use config::{DEFAULT_CONNECT_TIMEOUT, EntryConfig};
pub use entry::{
    Collaborators, EntryKind, EntryView, ManageSubscriptionAction, WIFI_LEVEL_MAX,
    WIFI_LEVEL_MIN, WIFI_LEVEL_UNREACHABLE, WifiEntry,
};
pub use error::CoreError;
pub use notify::{CallbackContext, EntryListener};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Identity
    NetworkHandle, NetworkKey,
    // Signals
    Capability, ConnectivityReport, DetailedState, LinkAddress, LinkInfo, LinkProperties,
    NetworkCapabilities, RouteInfo, Transport, WifiStandard,
    // Derived
    ConnectedState, ConnectionSnapshot, FrequencyBand,
    // Security
    SecurityDescriptor, SecurityType, classify, classify_all,
};
