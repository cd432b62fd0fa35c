// ── User actions ──
//
// Issue connect / disconnect / forget / sign-in through the manager and
// resolve each request from the manager's answer, later state transitions,
// or the connect timeout. The manager is always called without the lock.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::WifiEntry;
use super::state::{Effects, EntryState};
use crate::action::{
    ActionCallback, ActionKind, ActionListener, ActionStatus, ConnectCallback, ConnectStatus,
    DisconnectCallback, DisconnectStatus, ForgetCallback, ForgetStatus, SignInCallback,
    SignInStatus,
};
use crate::collaborator::SimCredential;
use crate::model::{ConnectedState, SecurityType};

impl WifiEntry {
    /// Connect to this network. `callback` fires exactly once unless the
    /// request is replaced or the entry shuts down first.
    pub fn connect(&self, callback: Option<ConnectCallback>) {
        let key = &self.inner.key;
        let rejected = match self.inner.resolver.sim_credential(key) {
            SimCredential::Absent => Some(ConnectStatus::FailureSimAbsent),
            _ if !self.inner.resolver.has_saved_config(key) && !self.is_open_like() => {
                Some(ConnectStatus::FailureNoConfig)
            }
            _ => None,
        };

        let listener = {
            let mut state = self.inner.lock_state();
            let generation = self.begin::<ConnectStatus>(&mut state, callback);
            if let Some(status) = rejected {
                debug!(key = %key, %status, "connect rejected before issuing");
                self.settle_locked(&mut state, generation, status);
                return;
            }
            self.listener_for::<ConnectStatus>(generation)
        };

        debug!(key = %key, "connect issued");
        self.inner.manager.connect(key, listener);
    }

    pub fn disconnect(&self, callback: Option<DisconnectCallback>) {
        let listener = self.issue::<DisconnectStatus>(callback);
        debug!(key = %self.inner.key, "disconnect issued");
        self.inner.manager.disconnect(&self.inner.key, listener);
    }

    pub fn forget(&self, callback: Option<ForgetCallback>) {
        let listener = self.issue::<ForgetStatus>(callback);
        debug!(key = %self.inner.key, "forget issued");
        self.inner.manager.forget(&self.inner.key, listener);
    }

    /// Start captive-portal sign-in for the tracked network.
    pub fn sign_in(&self, callback: Option<SignInCallback>) {
        let (listener, network) = {
            let mut state = self.inner.lock_state();
            let generation = self.begin::<SignInStatus>(&mut state, callback);
            let Some(network) = state.network() else {
                debug!(key = %self.inner.key, "sign-in without a tracked network");
                self.settle_locked(&mut state, generation, SignInStatus::FailureUnknown);
                return;
            };
            (self.listener_for::<SignInStatus>(generation), network)
        };

        debug!(key = %self.inner.key, network = network.0, "sign-in issued");
        self.inner
            .manager
            .start_captive_portal_sign_in(network, listener);
    }

    // ── Resolution ───────────────────────────────────────────────────

    /// Answer from the manager for the request of `generation`.
    pub(crate) fn on_action_result(&self, kind: ActionKind, generation: u64, succeeded: bool) {
        let mut state = self.inner.lock_state();
        let mut fx = Effects::default();

        let current = match (kind, succeeded) {
            (ActionKind::Connect, true) => {
                let accepted = state.actions.connect.accept(generation);
                if accepted {
                    if state.connected_state() == ConnectedState::Connected {
                        settle(&mut state, generation, ConnectStatus::Success, &mut fx);
                    } else {
                        self.arm_connect_timeout(&mut state, generation);
                    }
                }
                accepted
            }
            (ActionKind::Disconnect, true) => {
                let accepted = state.actions.disconnect.accept(generation);
                if accepted && state.connected_state() == ConnectedState::Disconnected {
                    settle(&mut state, generation, DisconnectStatus::Success, &mut fx);
                }
                accepted
            }
            (ActionKind::Connect, false) => {
                settle(&mut state, generation, ConnectStatus::FAILURE, &mut fx)
            }
            (ActionKind::Disconnect, false) => {
                settle(&mut state, generation, DisconnectStatus::FAILURE, &mut fx)
            }
            (ActionKind::Forget, ok) => {
                let status = if ok { ForgetStatus::SUCCESS } else { ForgetStatus::FAILURE };
                settle(&mut state, generation, status, &mut fx)
            }
            (ActionKind::SignIn, ok) => {
                let status = if ok { SignInStatus::SUCCESS } else { SignInStatus::FAILURE };
                settle(&mut state, generation, status, &mut fx)
            }
        };

        if !current {
            debug!(key = %self.inner.key, %kind, generation, succeeded, "stale action result ignored");
        }
        self.commit(&mut state, fx);
    }

    fn arm_connect_timeout(&self, state: &mut EntryState, generation: u64) {
        let token = CancellationToken::new();
        state.actions.connect.arm_timeout(generation, token.clone());

        let entry = Arc::downgrade(&self.inner);
        let timeout = self.inner.config.connect_timeout;
        self.inner.callbacks.runtime().spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(timeout) => {
                    if let Some(inner) = entry.upgrade() {
                        WifiEntry::from_inner(inner).connect_timed_out(generation);
                    }
                }
            }
        });
    }

    fn connect_timed_out(&self, generation: u64) {
        let mut state = self.inner.lock_state();
        if state.connected_state() == ConnectedState::Connected {
            self.settle_locked(&mut state, generation, ConnectStatus::Success);
            return;
        }
        if state.actions.connect.accepted_generation() == Some(generation) {
            warn!(
                key = %self.inner.key,
                timeout_ms = u64::try_from(self.inner.config.connect_timeout.as_millis()).unwrap_or(u64::MAX),
                "connect timed out"
            );
        }
        self.settle_locked(&mut state, generation, ConnectStatus::FailureUnknown);
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn begin<S: ActionStatus>(&self, state: &mut EntryState, callback: Option<ActionCallback<S>>) -> u64 {
        let generation = state.actions.next_generation();
        if let Some(replaced) = S::slot(&mut state.actions).begin(generation, callback) {
            debug!(
                key = %self.inner.key,
                kind = %S::KIND,
                replaced,
                generation,
                "pending action replaced"
            );
        }
        generation
    }

    fn issue<S: ActionStatus>(&self, callback: Option<ActionCallback<S>>) -> ActionListener {
        let mut state = self.inner.lock_state();
        let generation = self.begin::<S>(&mut state, callback);
        self.listener_for::<S>(generation)
    }

    fn listener_for<S: ActionStatus>(&self, generation: u64) -> ActionListener {
        ActionListener::new(Arc::downgrade(&self.inner), S::KIND, generation)
    }

    fn settle_locked<S: ActionStatus>(&self, state: &mut EntryState, generation: u64, status: S) {
        let mut fx = Effects::default();
        settle(state, generation, status, &mut fx);
        self.commit(state, fx);
    }

    /// Open-like networks can be joined without a saved config.
    fn is_open_like(&self) -> bool {
        let declared = match &self.inner.kind {
            super::EntryKind::Standard { security, .. } => security.is_open_like(),
            super::EntryKind::Passpoint { .. } => false,
        };
        declared
            || self
                .inner
                .view
                .load()
                .security_types
                .iter()
                .copied()
                .any(SecurityType::is_open_like)
    }
}

/// Returns `false` if `generation` is no longer the pending request.
fn settle<S: ActionStatus>(state: &mut EntryState, generation: u64, status: S, fx: &mut Effects) -> bool {
    let Some(resolution) = S::slot(&mut state.actions).resolve(generation, status) else {
        return false;
    };
    fx.resolved(status, resolution);
    true
}
