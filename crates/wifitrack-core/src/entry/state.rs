// ── Entry state machine ──
//
// All mutable state of one entry, guarded by the entry's lock. Transitions
// here are synchronous and side-effect free apart from recording which
// notifications and action results the caller must post afterwards.

use std::sync::Arc;

use tracing::trace;

use super::kind::EntryKind;
use super::view::{EntryView, WIFI_LEVEL_UNREACHABLE};
use crate::action::{ActionCoordinator, ActionKind, ActionStatus, ConnectStatus, DisconnectStatus, Resolution};
use crate::collaborator::WifiManager;
use crate::model::{
    Capability, ConnectedState, ConnectionSnapshot, ConnectivityReport, DetailedState, LinkInfo,
    LinkProperties, NetworkCapabilities, NetworkHandle, SecurityDescriptor, SecurityType,
    Transport, classify_all,
};
use crate::notify::NotificationChannel;

/// Optional "manage subscription" action supplied by the platform.
pub type ManageSubscriptionAction = Arc<dyn Fn() + Send + Sync + 'static>;

/// Work a transition asks the caller to post once the new view is published.
#[derive(Debug, Default)]
pub(crate) struct Effects {
    pub(crate) updates: usize,
    pub(crate) results: Vec<(ActionKind, u64)>,
}

impl Effects {
    pub(crate) fn updated(&mut self) {
        self.updates += 1;
    }

    pub(crate) fn resolved<S: ActionStatus>(&mut self, status: S, resolution: Resolution) {
        trace!(
            kind = %S::KIND,
            %status,
            generation = resolution.generation,
            elapsed_ms = resolution.elapsed_ms,
            "action resolved"
        );
        self.results.push((S::KIND, resolution.generation));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.updates == 0 && self.results.is_empty()
    }
}

pub(crate) struct EntryState {
    pub(crate) level: i32,
    /// Link info taken from the capabilities of the tracked network.
    link_info: Option<LinkInfo>,
    /// Legacy detailed-state signal from the link-layer event source.
    detailed_state: Option<DetailedState>,
    network: Option<NetworkHandle>,
    capabilities: Option<NetworkCapabilities>,
    default_capabilities: Option<NetworkCapabilities>,
    connectivity_report: Option<ConnectivityReport>,
    snapshot: Option<ConnectionSnapshot>,
    is_default_network: bool,
    known_security: Vec<SecurityType>,
    security_types: Vec<SecurityType>,
    version: u64,
    pub(crate) listener: NotificationChannel,
    pub(crate) actions: ActionCoordinator,
    pub(crate) manage_subscription: Option<ManageSubscriptionAction>,
}

impl EntryState {
    pub(crate) fn new(kind: &EntryKind, known: &[SecurityDescriptor]) -> Self {
        let known_security = classify_all(known);
        let security_types = kind.resolve_security(&known_security, None);
        Self {
            level: WIFI_LEVEL_UNREACHABLE,
            link_info: None,
            detailed_state: None,
            network: None,
            capabilities: None,
            default_capabilities: None,
            connectivity_report: None,
            snapshot: None,
            is_default_network: false,
            known_security,
            security_types,
            version: 0,
            listener: NotificationChannel::default(),
            actions: ActionCoordinator::default(),
            manage_subscription: None,
        }
    }

    // ── Derived state ────────────────────────────────────────────────

    pub(crate) fn connected_state(&self) -> ConnectedState {
        if self.capabilities.is_some() {
            return ConnectedState::Connected;
        }
        match self.detailed_state {
            Some(state) if state.is_connecting() => ConnectedState::Connecting,
            _ => ConnectedState::Disconnected,
        }
    }

    pub(crate) fn network(&self) -> Option<NetworkHandle> {
        self.network
    }

    pub(crate) fn has_internet_access(&self) -> bool {
        self.capabilities
            .as_ref()
            .is_some_and(|caps| caps.has_capability(Capability::Validated))
    }

    pub(crate) fn is_primary_network(&self) -> bool {
        if self.connected_state() == ConnectedState::Disconnected {
            return false;
        }
        self.detailed_state.is_some() || self.link_info.as_ref().is_some_and(|info| info.is_primary)
    }

    /// Validated Wi-Fi that the system still routes default traffic away from.
    pub(crate) fn is_low_quality(&self) -> bool {
        if !self.is_primary_network() {
            return false;
        }
        let (Some(caps), Some(default_caps)) = (&self.capabilities, &self.default_capabilities) else {
            return false;
        };
        caps.has_capability(Capability::Validated)
            && default_caps.has_transport(Transport::Cellular)
            && !default_caps.has_transport(Transport::Vpn)
    }

    pub(crate) fn can_sign_in(&self) -> bool {
        self.capabilities
            .as_ref()
            .is_some_and(|caps| caps.has_capability(Capability::CaptivePortal))
    }

    pub(crate) fn should_show_degraded_icon(&self) -> bool {
        self.connected_state() == ConnectedState::Connected
            && self.connectivity_report.is_some()
            && (!self.has_internet_access() || self.is_low_quality())
            && !self.can_sign_in()
            && self.is_primary_network()
    }

    pub(crate) fn connected_snapshot(&self) -> Option<ConnectionSnapshot> {
        if self.connected_state() != ConnectedState::Connected {
            return None;
        }
        let mut snapshot = self.snapshot.clone().unwrap_or_default();
        snapshot.validated = self.has_internet_access();
        snapshot.is_default_network = self.is_default_network;
        Some(snapshot)
    }

    #[cfg(test)]
    pub(crate) fn security_types(&self) -> &[SecurityType] {
        &self.security_types
    }

    /// Bump the version and build the record readers will see.
    pub(crate) fn publish(&mut self) -> EntryView {
        self.version += 1;
        self.view()
    }

    pub(crate) fn view(&self) -> EntryView {
        EntryView {
            version: self.version,
            connected_state: self.connected_state(),
            level: self.level,
            has_internet_access: self.has_internet_access(),
            is_default_network: self.is_default_network,
            is_primary_network: self.is_primary_network(),
            is_low_quality: self.is_low_quality(),
            can_sign_in: self.can_sign_in(),
            should_show_degraded_icon: self.should_show_degraded_icon(),
            can_manage_subscription: self.manage_subscription.is_some(),
            security_types: self.security_types.clone(),
            connected_snapshot: self.connected_snapshot(),
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    pub(crate) fn link_info_changed(
        &mut self,
        kind: &EntryKind,
        info: &LinkInfo,
        detailed_state: DetailedState,
        fx: &mut Effects,
    ) {
        if kind.matches(info) {
            self.detailed_state = Some(detailed_state);
            fx.updated();
        } else if self.detailed_state.take().is_some() {
            fx.updated();
        }
        self.settle_disconnect_if_disconnected(fx);
    }

    /// An accepted disconnect completes once the entry reads DISCONNECTED.
    fn settle_disconnect_if_disconnected(&mut self, fx: &mut Effects) {
        if self.connected_state() != ConnectedState::Disconnected {
            return;
        }
        if let Some(resolution) = self.actions.disconnect.resolve_accepted(DisconnectStatus::Success) {
            fx.resolved(DisconnectStatus::Success, resolution);
        }
    }

    pub(crate) fn capabilities_changed(
        &mut self,
        kind: &EntryKind,
        manager: &dyn WifiManager,
        network: NetworkHandle,
        capabilities: NetworkCapabilities,
        fx: &mut Effects,
    ) {
        let Some(info) = capabilities.link_info.clone() else {
            trace!(%network, "capabilities without link info ignored");
            return;
        };

        if !kind.matches(&info) {
            // Same network, different association: linked roaming away from us.
            if self.network == Some(network) {
                self.network_lost(kind, network, fx);
            }
            return;
        }

        if !info.is_primary && !capabilities.is_oem() {
            self.network_lost(kind, network, fx);
            return;
        }

        if let Some(rssi) = info.rssi {
            self.level = manager.calculate_signal_level(rssi);
        }
        self.snapshot
            .get_or_insert_with(ConnectionSnapshot::default)
            .apply_link_info(&info);
        self.link_info = Some(info);
        self.network = Some(network);
        self.capabilities = Some(capabilities);

        if let Some(resolution) = self.actions.connect.resolve_accepted(ConnectStatus::Success) {
            fx.resolved(ConnectStatus::Success, resolution);
        }

        self.update_security_types(kind);
        fx.updated();
    }

    pub(crate) fn link_properties_changed(
        &mut self,
        network: NetworkHandle,
        properties: &LinkProperties,
        fx: &mut Effects,
    ) {
        if self.network != Some(network) {
            return;
        }
        self.snapshot
            .get_or_insert_with(ConnectionSnapshot::default)
            .apply_link_properties(properties);
        fx.updated();
    }

    pub(crate) fn network_lost(&mut self, kind: &EntryKind, network: NetworkHandle, fx: &mut Effects) {
        if self.network != Some(network) {
            return;
        }

        self.link_info = None;
        self.detailed_state = None;
        self.network = None;
        self.capabilities = None;
        self.snapshot = None;
        self.connectivity_report = None;
        self.is_default_network = false;

        self.settle_disconnect_if_disconnected(fx);

        self.update_security_types(kind);
        fx.updated();
    }

    pub(crate) fn default_capabilities_changed(
        &mut self,
        kind: &EntryKind,
        manager: &dyn WifiManager,
        network: NetworkHandle,
        capabilities: NetworkCapabilities,
        fx: &mut Effects,
    ) {
        self.capabilities_changed(kind, manager, network, capabilities.clone(), fx);
        self.default_capabilities = Some(capabilities);
        self.is_default_network = self.network == Some(network);
        fx.updated();
    }

    pub(crate) fn default_network_lost(&mut self, fx: &mut Effects) {
        self.default_capabilities = None;
        self.is_default_network = false;
        fx.updated();
    }

    pub(crate) fn connectivity_report(&mut self, report: ConnectivityReport, fx: &mut Effects) {
        if self.network != Some(report.network) {
            return;
        }
        self.connectivity_report = Some(report);
        fx.updated();
    }

    pub(crate) fn set_known_security(
        &mut self,
        kind: &EntryKind,
        descriptors: &[SecurityDescriptor],
        fx: &mut Effects,
    ) {
        self.known_security = classify_all(descriptors);
        if self.update_security_types(kind) {
            fx.updated();
        }
    }

    /// Install the manage-subscription action; only the first one notifies.
    pub(crate) fn set_manage_subscription(&mut self, action: ManageSubscriptionAction, fx: &mut Effects) {
        let first = self.manage_subscription.is_none();
        self.manage_subscription = Some(action);
        if first {
            fx.updated();
        }
    }

    /// Returns `true` if the resolved list changed.
    fn update_security_types(&mut self, kind: &EntryKind) -> bool {
        let resolved = kind.resolve_security(&self.known_security, self.link_info.as_ref());
        if resolved == self.security_types {
            return false;
        }
        self.security_types = resolved;
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::action::ActionListener;
    use crate::model::NetworkKey;
    use pretty_assertions::assert_eq;

    struct LevelOnly;

    impl WifiManager for LevelOnly {
        fn calculate_signal_level(&self, rssi: i32) -> i32 {
            crate::collaborator::default_signal_level(rssi)
        }
        fn connect(&self, _: &NetworkKey, _: ActionListener) {}
        fn disconnect(&self, _: &NetworkKey, _: ActionListener) {}
        fn forget(&self, _: &NetworkKey, _: ActionListener) {}
        fn start_captive_portal_sign_in(&self, _: NetworkHandle, _: ActionListener) {}
    }

    const NET: NetworkHandle = NetworkHandle(100);
    const OTHER: NetworkHandle = NetworkHandle(200);

    fn kind() -> EntryKind {
        EntryKind::Standard {
            ssid: "Home".into(),
            security: SecurityType::Psk,
        }
    }

    fn home_info() -> LinkInfo {
        LinkInfo {
            ssid: Some("Home".into()),
            bssid: Some("aa:bb:cc:dd:ee:ff".into()),
            rssi: Some(-60),
            frequency_mhz: 5180,
            link_speed_mbps: 866,
            security: Some(SecurityDescriptor::PSK),
            is_primary: true,
            ..LinkInfo::default()
        }
    }

    fn wifi_caps(info: LinkInfo) -> NetworkCapabilities {
        NetworkCapabilities::default()
            .with_transport(Transport::Wifi)
            .with_capability(Capability::Internet)
            .with_link_info(info)
    }

    fn connected_state() -> EntryState {
        let mut state = EntryState::new(&kind(), &[SecurityDescriptor::PSK]);
        let mut fx = Effects::default();
        state.capabilities_changed(&kind(), &LevelOnly, NET, wifi_caps(home_info()), &mut fx);
        state
    }

    #[test]
    fn fresh_state_is_disconnected_and_unreachable() {
        let state = EntryState::new(&kind(), &[]);
        assert_eq!(state.connected_state(), ConnectedState::Disconnected);
        assert_eq!(state.level, WIFI_LEVEL_UNREACHABLE);
        assert!(state.security_types().is_empty());
        assert!(state.connected_snapshot().is_none());
    }

    #[test]
    fn link_info_then_capabilities_progresses_through_connecting() {
        let mut state = EntryState::new(&kind(), &[SecurityDescriptor::PSK]);
        let mut fx = Effects::default();

        state.link_info_changed(&kind(), &home_info(), DetailedState::Authenticating, &mut fx);
        assert_eq!(state.connected_state(), ConnectedState::Connecting);
        assert!(state.connected_snapshot().is_none());

        state.capabilities_changed(&kind(), &LevelOnly, NET, wifi_caps(home_info()), &mut fx);
        assert_eq!(state.connected_state(), ConnectedState::Connected);
        assert_eq!(fx.updates, 2);

        let snapshot = state.connected_snapshot().unwrap();
        assert_eq!(snapshot.frequency_mhz, 5180);
        assert_eq!(snapshot.link_speed_mbps, 866);
        assert_eq!(state.level, 3);
    }

    #[test]
    fn mismatched_link_info_clears_connecting_state() {
        let mut state = EntryState::new(&kind(), &[]);
        let mut fx = Effects::default();
        state.link_info_changed(&kind(), &home_info(), DetailedState::Connecting, &mut fx);

        let other = LinkInfo {
            ssid: Some("Cafe".into()),
            ..home_info()
        };
        state.link_info_changed(&kind(), &other, DetailedState::Connecting, &mut fx);
        assert_eq!(state.connected_state(), ConnectedState::Disconnected);
        assert_eq!(fx.updates, 2);

        // Nothing held any more: another mismatch is silent.
        state.link_info_changed(&kind(), &other, DetailedState::Connecting, &mut fx);
        assert_eq!(fx.updates, 2);
    }

    #[test]
    fn capabilities_without_link_info_are_ignored() {
        let mut state = connected_state();
        let before = state.connected_snapshot();
        let mut fx = Effects::default();
        state.capabilities_changed(
            &kind(),
            &LevelOnly,
            NET,
            NetworkCapabilities::default().with_transport(Transport::Wifi),
            &mut fx,
        );
        assert!(fx.is_empty());
        assert_eq!(state.connected_snapshot(), before);
    }

    #[test]
    fn roaming_to_another_ssid_on_tracked_handle_disconnects() {
        let mut state = connected_state();
        let mut fx = Effects::default();
        let roamed = LinkInfo {
            ssid: Some("Cafe".into()),
            ..home_info()
        };
        state.capabilities_changed(&kind(), &LevelOnly, NET, wifi_caps(roamed.clone()), &mut fx);
        assert_eq!(state.connected_state(), ConnectedState::Disconnected);
        assert_eq!(fx.updates, 1);

        // A mismatch on an untracked handle is silent.
        let mut fx = Effects::default();
        state.capabilities_changed(&kind(), &LevelOnly, OTHER, wifi_caps(roamed), &mut fx);
        assert!(fx.is_empty());
    }

    #[test]
    fn secondary_non_oem_connection_is_treated_as_lost() {
        let mut state = connected_state();
        let mut fx = Effects::default();
        let secondary = LinkInfo {
            is_primary: false,
            ..home_info()
        };
        state.capabilities_changed(&kind(), &LevelOnly, NET, wifi_caps(secondary.clone()), &mut fx);
        assert_eq!(state.connected_state(), ConnectedState::Disconnected);

        let oem = wifi_caps(secondary).with_capability(Capability::OemPaid);
        state.capabilities_changed(&kind(), &LevelOnly, NET, oem, &mut fx);
        assert_eq!(state.connected_state(), ConnectedState::Connected);
        assert!(!state.is_primary_network());
    }

    #[test]
    fn invalid_rssi_keeps_previous_level() {
        let mut state = connected_state();
        assert_eq!(state.level, 3);
        let mut fx = Effects::default();
        let no_rssi = LinkInfo {
            rssi: None,
            ..home_info()
        };
        state.capabilities_changed(&kind(), &LevelOnly, NET, wifi_caps(no_rssi), &mut fx);
        assert_eq!(state.level, 3);
    }

    #[test]
    fn network_lost_for_other_handle_changes_nothing() {
        let mut state = connected_state();
        let before = state.connected_snapshot();
        let mut fx = Effects::default();
        state.network_lost(&kind(), OTHER, &mut fx);
        assert!(fx.is_empty());
        assert_eq!(state.connected_state(), ConnectedState::Connected);
        assert_eq!(state.connected_snapshot(), before);
    }

    #[test]
    fn network_lost_clears_connection_state() {
        let mut state = connected_state();
        let mut fx = Effects::default();
        state.connectivity_report(ConnectivityReport { network: NET, validated: false }, &mut fx);
        state.network_lost(&kind(), NET, &mut fx);
        assert_eq!(state.connected_state(), ConnectedState::Disconnected);
        assert!(state.connected_snapshot().is_none());
        assert!(!state.should_show_degraded_icon());
        assert!(state.network().is_none());

        // Handle no longer tracked: a repeat is a no-op.
        let mut fx = Effects::default();
        state.network_lost(&kind(), NET, &mut fx);
        assert!(fx.is_empty());
    }

    #[test]
    fn link_properties_only_apply_to_tracked_network() {
        let mut state = connected_state();
        let props = LinkProperties {
            dns_servers: vec!["9.9.9.9".parse().unwrap()],
            ..LinkProperties::default()
        };
        let mut fx = Effects::default();
        state.link_properties_changed(OTHER, &props, &mut fx);
        assert!(fx.is_empty());

        state.link_properties_changed(NET, &props, &mut fx);
        assert_eq!(fx.updates, 1);
        assert_eq!(state.connected_snapshot().unwrap().dns_servers, vec!["9.9.9.9".to_owned()]);
    }

    #[test]
    fn low_quality_requires_cellular_default_without_vpn() {
        let kind = kind();
        let mut state = EntryState::new(&kind, &[]);
        let mut fx = Effects::default();
        let validated = wifi_caps(home_info()).with_capability(Capability::Validated);
        state.capabilities_changed(&kind, &LevelOnly, NET, validated, &mut fx);
        assert!(!state.is_low_quality());

        let cellular = NetworkCapabilities::default()
            .with_transport(Transport::Cellular)
            .with_capability(Capability::Validated);
        state.default_capabilities_changed(&kind, &LevelOnly, OTHER, cellular.clone(), &mut fx);
        assert!(state.is_low_quality());
        assert!(!state.is_default_network);

        let cellular_vpn = cellular.with_transport(Transport::Vpn);
        state.default_capabilities_changed(&kind, &LevelOnly, OTHER, cellular_vpn, &mut fx);
        assert!(!state.is_low_quality());

        let wifi_default = wifi_caps(home_info()).with_capability(Capability::Validated);
        state.default_capabilities_changed(&kind, &LevelOnly, NET, wifi_default, &mut fx);
        assert!(!state.is_low_quality());
        assert!(state.is_default_network);

        state.default_network_lost(&mut fx);
        assert!(!state.is_default_network);
        assert!(!state.is_low_quality());
    }

    #[test]
    fn degraded_icon_needs_report_and_missing_validation() {
        let mut state = connected_state();
        assert!(!state.should_show_degraded_icon());

        let mut fx = Effects::default();
        state.connectivity_report(ConnectivityReport { network: OTHER, validated: false }, &mut fx);
        assert!(fx.is_empty());
        assert!(!state.should_show_degraded_icon());

        state.connectivity_report(ConnectivityReport { network: NET, validated: false }, &mut fx);
        assert!(state.should_show_degraded_icon());

        // Captive portals get a sign-in affordance instead.
        let portal = wifi_caps(home_info()).with_capability(Capability::CaptivePortal);
        state.capabilities_changed(&kind(), &LevelOnly, NET, portal, &mut fx);
        assert!(state.can_sign_in());
        assert!(!state.should_show_degraded_icon());
    }

    #[test]
    fn connected_security_type_replaces_known_types() {
        let kind = kind();
        let mut state = EntryState::new(&kind, &[SecurityDescriptor::PSK, SecurityDescriptor::SAE]);
        assert_eq!(state.security_types(), &[SecurityType::Psk, SecurityType::Sae]);

        let mut fx = Effects::default();
        let sae = LinkInfo {
            security: Some(SecurityDescriptor::SAE),
            ..home_info()
        };
        state.capabilities_changed(&kind, &LevelOnly, NET, wifi_caps(sae), &mut fx);
        assert_eq!(state.security_types(), &[SecurityType::Sae]);

        state.network_lost(&kind, NET, &mut fx);
        assert_eq!(state.security_types(), &[SecurityType::Psk, SecurityType::Sae]);
    }

    #[test]
    fn known_security_notifies_only_on_change() {
        let kind = kind();
        let mut state = EntryState::new(&kind, &[]);
        let mut fx = Effects::default();
        state.set_known_security(&kind, &[SecurityDescriptor::PSK], &mut fx);
        assert_eq!(fx.updates, 1);
        state.set_known_security(&kind, &[SecurityDescriptor::PSK], &mut fx);
        assert_eq!(fx.updates, 1);
    }

    #[test]
    fn manage_subscription_notifies_on_first_set_only() {
        let mut state = EntryState::new(&kind(), &[]);
        let mut fx = Effects::default();
        state.set_manage_subscription(Arc::new(|| {}), &mut fx);
        state.set_manage_subscription(Arc::new(|| {}), &mut fx);
        assert_eq!(fx.updates, 1);
        assert!(state.publish().can_manage_subscription);
    }

    #[test]
    fn publish_bumps_version() {
        let mut state = connected_state();
        let first = state.publish();
        let second = state.publish();
        assert_eq!(second.version, first.version + 1);
        assert_eq!(first.connected_state, ConnectedState::Connected);
        assert!(first.connected_snapshot.is_some());
    }
}
