// ── Action coordination ──
//
// Tracks user-initiated connect / disconnect / forget / sign-in requests.
// Each kind has one slot holding at most one pending request. Resolution
// moves the request out of the slot into a delivery queue keyed by
// generation; the callback context drains it. Everything here runs under
// the owning entry's lock.

use std::fmt;
use std::sync::Weak;

use serde::Serialize;
use strum::Display;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::entry::{EntryInner, WifiEntry};

// ── Kinds & statuses ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    Connect,
    Disconnect,
    Forget,
    SignIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectStatus {
    Success,
    FailureNoConfig,
    FailureUnknown,
    FailureSimAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DisconnectStatus {
    Success,
    FailureUnknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForgetStatus {
    Success,
    FailureUnknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SignInStatus {
    Success,
    FailureUnknown,
}

pub type ActionCallback<S> = Box<dyn FnOnce(S) + Send + 'static>;
pub type ConnectCallback = ActionCallback<ConnectStatus>;
pub type DisconnectCallback = ActionCallback<DisconnectStatus>;
pub type ForgetCallback = ActionCallback<ForgetStatus>;
pub type SignInCallback = ActionCallback<SignInStatus>;

/// Ties a status type to its kind and its slot in the coordinator.
pub(crate) trait ActionStatus: Copy + fmt::Debug + fmt::Display + Send + 'static {
    const KIND: ActionKind;
    const SUCCESS: Self;
    const FAILURE: Self;

    fn slot(coordinator: &mut ActionCoordinator) -> &mut ActionSlot<Self>;
}

impl ActionStatus for ConnectStatus {
    const KIND: ActionKind = ActionKind::Connect;
    const SUCCESS: Self = Self::Success;
    const FAILURE: Self = Self::FailureUnknown;

    fn slot(coordinator: &mut ActionCoordinator) -> &mut ActionSlot<Self> {
        &mut coordinator.connect
    }
}

impl ActionStatus for DisconnectStatus {
    const KIND: ActionKind = ActionKind::Disconnect;
    const SUCCESS: Self = Self::Success;
    const FAILURE: Self = Self::FailureUnknown;

    fn slot(coordinator: &mut ActionCoordinator) -> &mut ActionSlot<Self> {
        &mut coordinator.disconnect
    }
}

impl ActionStatus for ForgetStatus {
    const KIND: ActionKind = ActionKind::Forget;
    const SUCCESS: Self = Self::Success;
    const FAILURE: Self = Self::FailureUnknown;

    fn slot(coordinator: &mut ActionCoordinator) -> &mut ActionSlot<Self> {
        &mut coordinator.forget
    }
}

impl ActionStatus for SignInStatus {
    const KIND: ActionKind = ActionKind::SignIn;
    const SUCCESS: Self = Self::Success;
    const FAILURE: Self = Self::FailureUnknown;

    fn slot(coordinator: &mut ActionCoordinator) -> &mut ActionSlot<Self> {
        &mut coordinator.sign_in
    }
}

// ── Slots ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Handed to the manager, no answer yet.
    Issued,
    /// Manager accepted; waiting for a confirming transition.
    Accepted,
}

pub(crate) struct PendingAction<S> {
    generation: u64,
    created_at: Instant,
    phase: Phase,
    callback: Option<ActionCallback<S>>,
    timeout: Option<CancellationToken>,
}

impl<S> PendingAction<S> {
    fn cancel_timeout(&mut self) {
        if let Some(token) = self.timeout.take() {
            token.cancel();
        }
    }
}

/// A resolved request waiting for delivery on the callback context.
pub(crate) struct ResolvedAction<S> {
    pub(crate) status: S,
    pub(crate) callback: Option<ActionCallback<S>>,
}

pub(crate) struct ActionSlot<S> {
    pending: Option<PendingAction<S>>,
    resolved: Vec<(u64, ResolvedAction<S>)>,
}

impl<S> Default for ActionSlot<S> {
    fn default() -> Self {
        Self {
            pending: None,
            resolved: Vec::new(),
        }
    }
}

impl<S: Copy> ActionSlot<S> {
    /// Start a new request, replacing (and silently dropping) any pending one.
    /// Returns the generation of the replaced request.
    pub(crate) fn begin(&mut self, generation: u64, callback: Option<ActionCallback<S>>) -> Option<u64> {
        let replaced = self.pending.take().map(|mut old| {
            old.cancel_timeout();
            old.generation
        });
        self.pending = Some(PendingAction {
            generation,
            created_at: Instant::now(),
            phase: Phase::Issued,
            callback,
            timeout: None,
        });
        replaced
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Generation of the pending request, if it has been accepted.
    pub(crate) fn accepted_generation(&self) -> Option<u64> {
        self.pending
            .as_ref()
            .filter(|p| p.phase == Phase::Accepted)
            .map(|p| p.generation)
    }

    /// Mark the pending request of `generation` accepted. `false` if stale.
    pub(crate) fn accept(&mut self, generation: u64) -> bool {
        match self.pending.as_mut() {
            Some(p) if p.generation == generation && p.phase == Phase::Issued => {
                p.phase = Phase::Accepted;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn arm_timeout(&mut self, generation: u64, token: CancellationToken) {
        match self.pending.as_mut() {
            Some(p) if p.generation == generation => {
                p.cancel_timeout();
                p.timeout = Some(token);
            }
            _ => token.cancel(),
        }
    }

    /// Resolve the pending request if it belongs to `generation`.
    pub(crate) fn resolve(&mut self, generation: u64, status: S) -> Option<Resolution> {
        if self.pending.as_ref().map(|p| p.generation) != Some(generation) {
            return None;
        }
        let mut pending = self.pending.take()?;
        pending.cancel_timeout();
        let elapsed = pending.created_at.elapsed();
        self.resolved.push((
            pending.generation,
            ResolvedAction {
                status,
                callback: pending.callback.take(),
            },
        ));
        Some(Resolution {
            generation,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        })
    }

    /// Resolve the pending request only if the manager already accepted it.
    pub(crate) fn resolve_accepted(&mut self, status: S) -> Option<Resolution> {
        let generation = self.accepted_generation()?;
        self.resolve(generation, status)
    }

    pub(crate) fn take_resolved(&mut self, generation: u64) -> Option<ResolvedAction<S>> {
        let idx = self.resolved.iter().position(|(g, _)| *g == generation)?;
        Some(self.resolved.remove(idx).1)
    }

    /// Drop the pending request and every undelivered result.
    pub(crate) fn cancel(&mut self) -> bool {
        let had_any = self.pending.is_some() || !self.resolved.is_empty();
        if let Some(mut pending) = self.pending.take() {
            pending.cancel_timeout();
        }
        self.resolved.clear();
        had_any
    }
}

/// Generation plus age of a freshly resolved request, for logging and delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolution {
    pub(crate) generation: u64,
    pub(crate) elapsed_ms: u64,
}

// ── Coordinator ─────────────────────────────────────────────────────

/// One slot per action kind. Kinds never interact.
#[derive(Default)]
pub(crate) struct ActionCoordinator {
    next_generation: u64,
    pub(crate) connect: ActionSlot<ConnectStatus>,
    pub(crate) disconnect: ActionSlot<DisconnectStatus>,
    pub(crate) forget: ActionSlot<ForgetStatus>,
    pub(crate) sign_in: ActionSlot<SignInStatus>,
}

impl ActionCoordinator {
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    pub(crate) fn is_pending(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Connect => self.connect.is_pending(),
            ActionKind::Disconnect => self.disconnect.is_pending(),
            ActionKind::Forget => self.forget.is_pending(),
            ActionKind::SignIn => self.sign_in.is_pending(),
        }
    }

    /// Cancel every kind. Returns `true` if anything was dropped.
    pub(crate) fn cancel_all(&mut self) -> bool {
        let connect = self.connect.cancel();
        let disconnect = self.disconnect.cancel();
        let forget = self.forget.cancel();
        let sign_in = self.sign_in.cancel();
        connect || disconnect || forget || sign_in
    }
}

// ── ActionListener ──────────────────────────────────────────────────

/// One-shot result handle given to the [`WifiManager`](crate::WifiManager)
/// with each issued action.
///
/// Consumed by [`succeeded`](Self::succeeded) or [`failed`](Self::failed).
/// A handle belonging to a replaced request, or to a discarded entry, is
/// ignored.
pub struct ActionListener {
    entry: Weak<EntryInner>,
    kind: ActionKind,
    generation: u64,
}

impl ActionListener {
    pub(crate) fn new(entry: Weak<EntryInner>, kind: ActionKind, generation: u64) -> Self {
        Self {
            entry,
            kind,
            generation,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// The manager accepted (connect / disconnect) or completed (forget / sign-in) the action.
    pub fn succeeded(self) {
        self.report(true);
    }

    /// The manager rejected or failed the action.
    pub fn failed(self) {
        self.report(false);
    }

    fn report(self, succeeded: bool) {
        if let Some(inner) = self.entry.upgrade() {
            WifiEntry::from_inner(inner).on_action_result(self.kind, self.generation, succeeded);
        }
    }
}

impl fmt::Debug for ActionListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionListener")
            .field("kind", &self.kind)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_callback(out: &Arc<Mutex<Vec<ConnectStatus>>>) -> ConnectCallback {
        let out = Arc::clone(out);
        Box::new(move |status| out.lock().unwrap().push(status))
    }

    #[tokio::test]
    async fn resolve_moves_request_to_delivery_queue() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut slot = ActionSlot::default();
        slot.begin(1, Some(recording_callback(&seen)));
        assert!(slot.is_pending());

        let res = slot.resolve(1, ConnectStatus::FailureNoConfig).unwrap();
        assert_eq!(res.generation, 1);
        assert!(!slot.is_pending());

        let delivered = slot.take_resolved(1).unwrap();
        (delivered.callback.unwrap())(delivered.status);
        assert_eq!(*seen.lock().unwrap(), vec![ConnectStatus::FailureNoConfig]);
        assert!(slot.take_resolved(1).is_none());
    }

    #[tokio::test]
    async fn stale_generation_cannot_resolve_or_accept() {
        let mut slot: ActionSlot<ConnectStatus> = ActionSlot::default();
        slot.begin(1, None);
        assert_eq!(slot.begin(2, None), Some(1));

        assert!(!slot.accept(1));
        assert!(slot.resolve(1, ConnectStatus::Success).is_none());
        assert!(slot.accept(2));
        assert_eq!(slot.accepted_generation(), Some(2));
    }

    #[tokio::test]
    async fn replacing_cancels_armed_timeout() {
        let mut slot: ActionSlot<ConnectStatus> = ActionSlot::default();
        slot.begin(1, None);
        slot.accept(1);
        let token = CancellationToken::new();
        slot.arm_timeout(1, token.clone());

        slot.begin(2, None);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn resolve_accepted_ignores_issued_requests() {
        let mut slot: ActionSlot<DisconnectStatus> = ActionSlot::default();
        slot.begin(7, None);
        assert!(slot.resolve_accepted(DisconnectStatus::Success).is_none());
        slot.accept(7);
        assert!(slot.resolve_accepted(DisconnectStatus::Success).is_some());
    }

    #[tokio::test]
    async fn cancel_drops_undelivered_results() {
        let mut slot: ActionSlot<ForgetStatus> = ActionSlot::default();
        slot.begin(3, None);
        slot.resolve(3, ForgetStatus::Success);
        assert!(slot.cancel());
        assert!(slot.take_resolved(3).is_none());
        assert!(!slot.cancel());
    }

    #[test]
    fn generations_are_unique_across_kinds() {
        let mut coordinator = ActionCoordinator::default();
        let a = coordinator.next_generation();
        let b = coordinator.next_generation();
        assert_ne!(a, b);
    }
}
