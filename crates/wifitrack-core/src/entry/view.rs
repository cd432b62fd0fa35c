// ── Published entry view ──

use serde::Serialize;

use crate::model::{ConnectedState, ConnectionSnapshot, SecurityType};

/// Signal level of an entry that is not currently reachable.
pub const WIFI_LEVEL_UNREACHABLE: i32 = -1;
pub const WIFI_LEVEL_MIN: i32 = 0;
pub const WIFI_LEVEL_MAX: i32 = 4;

/// Immutable record of everything readers may observe about an entry.
///
/// Rebuilt from the locked state at the end of every mutation and swapped
/// in atomically, so every field comes from the same mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct EntryView {
    /// Bumped on every published mutation.
    pub version: u64,
    pub connected_state: ConnectedState,
    pub level: i32,
    pub has_internet_access: bool,
    pub is_default_network: bool,
    pub is_primary_network: bool,
    pub is_low_quality: bool,
    pub can_sign_in: bool,
    pub should_show_degraded_icon: bool,
    pub can_manage_subscription: bool,
    pub security_types: Vec<SecurityType>,
    /// Present iff `connected_state` is `Connected`.
    pub connected_snapshot: Option<ConnectionSnapshot>,
}

impl Default for EntryView {
    fn default() -> Self {
        Self {
            version: 0,
            connected_state: ConnectedState::Disconnected,
            level: WIFI_LEVEL_UNREACHABLE,
            has_internet_access: false,
            is_default_network: false,
            is_primary_network: false,
            is_low_quality: false,
            can_sign_in: false,
            should_show_degraded_icon: false,
            can_manage_subscription: false,
            security_types: Vec::new(),
            connected_snapshot: None,
        }
    }
}
