// ── External collaborators ──
//
// The entry never talks to the radio or to configuration storage itself.
// A platform backend implements these traits and hands them in.

use serde::{Deserialize, Serialize};

use crate::action::ActionListener;
use crate::model::{NetworkHandle, NetworkKey};

/// Network-management backend: signal math and user-initiated actions.
///
/// Action methods must return promptly; the outcome is reported later (or
/// synchronously, from inside the call) through the supplied listener.
pub trait WifiManager: Send + Sync {
    /// Map a raw RSSI (dBm) onto a display level in `0..=4`.
    fn calculate_signal_level(&self, rssi: i32) -> i32;

    fn connect(&self, key: &NetworkKey, listener: ActionListener);

    fn disconnect(&self, key: &NetworkKey, listener: ActionListener);

    fn forget(&self, key: &NetworkKey, listener: ActionListener);

    /// Launch the captive-portal sign-in flow for a connected network.
    fn start_captive_portal_sign_in(&self, network: NetworkHandle, listener: ActionListener);
}

/// Whether a network needs a SIM credential, and whether one is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimCredential {
    #[default]
    NotRequired,
    Present,
    Absent,
}

/// Saved-configuration lookups used by the connect pre-checks.
pub trait ConfigResolver: Send + Sync {
    fn has_saved_config(&self, key: &NetworkKey) -> bool;

    fn sim_credential(&self, key: &NetworkKey) -> SimCredential;
}

/// Signal-level calculation used when no backend-specific curve exists.
///
/// Evenly splits `-100..=-55` dBm into five buckets.
pub fn default_signal_level(rssi: i32) -> i32 {
    const MIN_RSSI: i32 = -100;
    const MAX_RSSI: i32 = -55;
    const LEVELS: i32 = 5;

    if rssi <= MIN_RSSI {
        0
    } else if rssi >= MAX_RSSI {
        LEVELS - 1
    } else {
        let input_range = MAX_RSSI - MIN_RSSI;
        (rssi - MIN_RSSI) * (LEVELS - 1) / input_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_levels_cover_full_range() {
        assert_eq!(default_signal_level(-120), 0);
        assert_eq!(default_signal_level(-100), 0);
        assert_eq!(default_signal_level(-78), 1);
        assert_eq!(default_signal_level(-60), 3);
        assert_eq!(default_signal_level(-55), 4);
        assert_eq!(default_signal_level(-30), 4);
    }
}
