// ── Wi-Fi entry ──
//
// A `WifiEntry` aggregates the event streams of one network into a single
// coherent view. Mutations serialize on one lock and end by publishing a
// fresh `EntryView`; readers load the published view without locking.
// Notifications and action results are enqueued on the callback context
// while the lock is still held, so delivery order matches mutation order.

mod actions;
mod kind;
mod state;
mod view;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use arc_swap::ArcSwap;
use tracing::{debug, trace};

use crate::action::{ActionKind, ActionStatus, ConnectStatus, DisconnectStatus, ForgetStatus, SignInStatus};
use crate::collaborator::{ConfigResolver, WifiManager};
use crate::config::EntryConfig;
use crate::error::CoreError;
use crate::model::{
    ConnectedState, ConnectionSnapshot, ConnectivityReport, DetailedState, LinkInfo,
    LinkProperties, NetworkCapabilities, NetworkHandle, NetworkKey, SecurityDescriptor,
    SecurityType,
};
use crate::notify::{CallbackContext, EntryListener};

pub use kind::EntryKind;
pub use state::ManageSubscriptionAction;
pub use view::{EntryView, WIFI_LEVEL_MAX, WIFI_LEVEL_MIN, WIFI_LEVEL_UNREACHABLE};

use state::{Effects, EntryState};

/// The external services an entry delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub manager: Arc<dyn WifiManager>,
    pub resolver: Arc<dyn ConfigResolver>,
}

pub(crate) struct EntryInner {
    key: NetworkKey,
    kind: EntryKind,
    config: EntryConfig,
    manager: Arc<dyn WifiManager>,
    resolver: Arc<dyn ConfigResolver>,
    callbacks: CallbackContext,
    state: Mutex<EntryState>,
    view: ArcSwap<EntryView>,
}

impl EntryInner {
    fn lock_state(&self) -> MutexGuard<'_, EntryState> {
        // A panicking listener never runs under this lock; recover the data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread-safe handle to one network entry. Clones share the same entry.
///
/// Equality and hashing go by [`NetworkKey`] only.
#[derive(Clone)]
pub struct WifiEntry {
    inner: Arc<EntryInner>,
}

impl WifiEntry {
    pub fn new(
        kind: EntryKind,
        collaborators: Collaborators,
        callbacks: CallbackContext,
        config: EntryConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let key = kind.key();
        let state = EntryState::new(&kind, &[]);
        let view = ArcSwap::from_pointee(state.view());
        debug!(key = %key, "entry created");
        Ok(Self {
            inner: Arc::new(EntryInner {
                key,
                kind,
                config,
                manager: collaborators.manager,
                resolver: collaborators.resolver,
                callbacks,
                state: Mutex::new(state),
                view,
            }),
        })
    }

    pub(crate) fn from_inner(inner: Arc<EntryInner>) -> Self {
        Self { inner }
    }

    pub fn key(&self) -> &NetworkKey {
        &self.inner.key
    }

    pub fn kind(&self) -> &EntryKind {
        &self.inner.kind
    }

    pub fn title(&self) -> &str {
        self.inner.kind.title()
    }

    // ── Listener ─────────────────────────────────────────────────────

    /// Register the listener, replacing any previous one. Held weakly.
    pub fn set_listener<L: EntryListener + 'static>(&self, listener: &Arc<L>) {
        let weak: Weak<dyn EntryListener> = Arc::<L>::downgrade(listener);
        self.inner.lock_state().listener.set(weak);
    }

    /// Same as [`set_listener`](Self::set_listener) for an already type-erased listener.
    pub fn set_shared_listener(&self, listener: &Arc<dyn EntryListener>) {
        self.inner.lock_state().listener.set(Arc::downgrade(listener));
    }

    /// Notifications already queued but not yet delivered are dropped.
    pub fn clear_listener(&self) {
        self.inner.lock_state().listener.clear();
    }

    pub fn has_listener(&self) -> bool {
        self.inner.lock_state().listener.is_set()
    }

    /// Drop the listener and every pending action. Nothing queued for this
    /// entry fires afterwards.
    pub fn cancel_all(&self) {
        let mut state = self.inner.lock_state();
        state.listener.clear();
        if state.actions.cancel_all() {
            debug!(key = %self.inner.key, "pending actions cancelled");
        }
    }

    /// Detach the entry from the UI for good. Alias of [`cancel_all`](Self::cancel_all).
    pub fn shutdown(&self) {
        self.cancel_all();
    }

    // ── Event inputs ─────────────────────────────────────────────────

    pub fn on_link_info_changed(&self, info: &LinkInfo, detailed_state: DetailedState) {
        self.mutate("link_info", |state, fx| {
            state.link_info_changed(&self.inner.kind, info, detailed_state, fx);
        });
    }

    pub fn on_capabilities_changed(&self, network: NetworkHandle, capabilities: NetworkCapabilities) {
        self.mutate("capabilities", |state, fx| {
            state.capabilities_changed(
                &self.inner.kind,
                self.inner.manager.as_ref(),
                network,
                capabilities,
                fx,
            );
        });
    }

    pub fn on_link_properties_changed(&self, network: NetworkHandle, properties: &LinkProperties) {
        self.mutate("link_properties", |state, fx| {
            state.link_properties_changed(network, properties, fx);
        });
    }

    pub fn on_network_lost(&self, network: NetworkHandle) {
        self.mutate("network_lost", |state, fx| {
            state.network_lost(&self.inner.kind, network, fx);
        });
    }

    /// The system default network changed. Also runs the regular
    /// capabilities path for `network`.
    pub fn on_default_network_capabilities_changed(
        &self,
        network: NetworkHandle,
        capabilities: NetworkCapabilities,
    ) {
        self.mutate("default_capabilities", |state, fx| {
            state.default_capabilities_changed(
                &self.inner.kind,
                self.inner.manager.as_ref(),
                network,
                capabilities,
                fx,
            );
        });
    }

    pub fn on_default_network_lost(&self) {
        self.mutate("default_network_lost", |state, fx| state.default_network_lost(fx));
    }

    pub fn on_connectivity_report(&self, report: ConnectivityReport) {
        self.mutate("connectivity_report", |state, fx| {
            state.connectivity_report(report, fx);
        });
    }

    /// Security types learned from scan results or saved configs.
    pub fn set_known_security_types(&self, descriptors: &[SecurityDescriptor]) {
        self.mutate("known_security", |state, fx| {
            state.set_known_security(&self.inner.kind, descriptors, fx);
        });
    }

    pub fn set_manage_subscription_action(&self, action: ManageSubscriptionAction) {
        self.mutate("manage_subscription", |state, fx| {
            state.set_manage_subscription(action, fx);
        });
    }

    /// Run the manage-subscription action, if one is installed.
    /// Returns `false` when none is.
    pub fn manage_subscription(&self) -> bool {
        let action = self.inner.lock_state().manage_subscription.clone();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    // ── Readers ──────────────────────────────────────────────────────

    /// The last published view. Every field comes from the same mutation.
    pub fn view(&self) -> Arc<EntryView> {
        self.inner.view.load_full()
    }

    pub fn connected_state(&self) -> ConnectedState {
        self.inner.view.load().connected_state
    }

    pub fn level(&self) -> i32 {
        self.inner.view.load().level
    }

    pub fn has_internet_access(&self) -> bool {
        self.inner.view.load().has_internet_access
    }

    pub fn is_default_network(&self) -> bool {
        self.inner.view.load().is_default_network
    }

    pub fn is_primary_network(&self) -> bool {
        self.inner.view.load().is_primary_network
    }

    pub fn is_low_quality(&self) -> bool {
        self.inner.view.load().is_low_quality
    }

    pub fn should_show_degraded_icon(&self) -> bool {
        self.inner.view.load().should_show_degraded_icon
    }

    pub fn can_sign_in(&self) -> bool {
        self.inner.view.load().can_sign_in
    }

    pub fn can_manage_subscription(&self) -> bool {
        self.inner.view.load().can_manage_subscription
    }

    pub fn connected_snapshot(&self) -> Option<ConnectionSnapshot> {
        self.inner.view.load().connected_snapshot.clone()
    }

    pub fn security_types(&self) -> Vec<SecurityType> {
        self.inner.view.load().security_types.clone()
    }

    pub fn can_connect(&self) -> bool {
        self.connected_state() == ConnectedState::Disconnected
    }

    pub fn can_disconnect(&self) -> bool {
        self.connected_state() == ConnectedState::Connected
    }

    pub fn can_forget(&self) -> bool {
        self.inner.resolver.has_saved_config(&self.inner.key)
    }

    pub fn is_action_pending(&self, kind: ActionKind) -> bool {
        self.inner.lock_state().actions.is_pending(kind)
    }

    // ── Commit plumbing ──────────────────────────────────────────────

    fn mutate(&self, event: &'static str, apply: impl FnOnce(&mut EntryState, &mut Effects)) {
        let mut state = self.inner.lock_state();
        let mut fx = Effects::default();
        apply(&mut state, &mut fx);
        if fx.is_empty() {
            trace!(key = %self.inner.key, event, "event ignored");
            return;
        }
        self.commit(&mut state, fx);
    }

    /// Publish the new view and enqueue deliveries. Caller holds the lock.
    fn commit(&self, state: &mut EntryState, fx: Effects) {
        if fx.is_empty() {
            return;
        }
        let previous = self.inner.view.load().connected_state;
        let view = Arc::new(state.publish());
        if view.connected_state != previous {
            debug!(
                key = %self.inner.key,
                from = %previous,
                to = %view.connected_state,
                level = view.level,
                "connected state changed"
            );
        }
        self.inner.view.store(view);

        for (kind, generation) in fx.results {
            match kind {
                ActionKind::Connect => self.post_result::<ConnectStatus>(generation),
                ActionKind::Disconnect => self.post_result::<DisconnectStatus>(generation),
                ActionKind::Forget => self.post_result::<ForgetStatus>(generation),
                ActionKind::SignIn => self.post_result::<SignInStatus>(generation),
            }
        }
        for _ in 0..fx.updates {
            self.post_update();
        }
    }

    fn post_update(&self) {
        let entry = Arc::downgrade(&self.inner);
        let posted = self.inner.callbacks.post(move || {
            let Some(inner) = entry.upgrade() else {
                return;
            };
            let listener = inner.lock_state().listener.current();
            if let Some(listener) = listener {
                listener.on_updated(&inner.key);
            }
        });
        if !posted {
            trace!(key = %self.inner.key, "callback context closed; update dropped");
        }
    }

    fn post_result<S: ActionStatus>(&self, generation: u64) {
        let entry = Arc::downgrade(&self.inner);
        let posted = self.inner.callbacks.post(move || {
            let Some(inner) = entry.upgrade() else {
                return;
            };
            let resolved = S::slot(&mut inner.lock_state().actions).take_resolved(generation);
            let Some(resolved) = resolved else {
                return;
            };
            if let Some(callback) = resolved.callback {
                callback(resolved.status);
            }
        });
        if !posted {
            trace!(key = %self.inner.key, kind = %S::KIND, "callback context closed; result dropped");
        }
    }
}

impl PartialEq for WifiEntry {
    fn eq(&self, other: &Self) -> bool {
        self.inner.key == other.inner.key
    }
}

impl Eq for WifiEntry {}

impl Hash for WifiEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.key.hash(state);
    }
}

impl fmt::Display for WifiEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.inner.view.load();
        write!(f, "{} level={}", self.inner.key, view.level)?;
        if view.should_show_degraded_icon {
            f.write_str("!")?;
        }
        let security: Vec<String> = view.security_types.iter().map(ToString::to_string).collect();
        write!(f, " security=[{}] {}", security.join(","), view.connected_state)?;
        if let Some(snapshot) = &view.connected_snapshot {
            write!(
                f,
                " ({} {}Mbps {})",
                snapshot.frequency_band, snapshot.link_speed_mbps, snapshot.wifi_standard
            )?;
        }
        write!(
            f,
            " internet={} default={} primary={}",
            view.has_internet_access, view.is_default_network, view.is_primary_network
        )
    }
}

impl fmt::Debug for WifiEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiEntry")
            .field("key", &self.inner.key)
            .field("view", &**self.inner.view.load())
            .finish_non_exhaustive()
    }
}
