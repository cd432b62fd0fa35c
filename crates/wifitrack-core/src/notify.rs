// ── Notification delivery ──
//
// Every listener and action callback runs on one callback context: a single
// tokio task draining a FIFO job queue. Producers only enqueue, so no
// callback ever runs on a producer thread or with an entry lock held.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::NetworkKey;

type Job = Box<dyn FnOnce() + Send + 'static>;

// ── EntryListener ───────────────────────────────────────────────────

/// Receives "state changed" notifications for one entry.
///
/// Called on the callback context. Implementations may read any accessor
/// of the entry; reads never block.
pub trait EntryListener: Send + Sync {
    fn on_updated(&self, key: &NetworkKey);
}

// ── CallbackContext ─────────────────────────────────────────────────

/// Single-consumer execution context for callbacks.
///
/// Cheaply cloneable; all clones feed the same queue. The consumer task
/// exits once every clone (and every entry holding one) is dropped.
#[derive(Clone)]
pub struct CallbackContext {
    tx: mpsc::UnboundedSender<Job>,
    runtime: Handle,
}

impl CallbackContext {
    /// Spawn the consumer task on the given runtime.
    pub fn new(runtime: &Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(dispatch_task(rx));
        Self {
            tx,
            runtime: runtime.clone(),
        }
    }

    /// Spawn the consumer task on the runtime of the calling thread.
    pub fn current() -> Result<Self, CoreError> {
        let runtime = Handle::try_current().map_err(|_| CoreError::NoRuntime)?;
        Ok(Self::new(&runtime))
    }

    /// Wait until every job posted before this call has run.
    pub async fn flush(&self) -> Result<(), CoreError> {
        let (done_tx, done_rx) = oneshot::channel();
        if !self.post(move || {
            let _ = done_tx.send(());
        }) {
            return Err(CoreError::CallbackContextClosed);
        }
        done_rx.await.map_err(|_| CoreError::CallbackContextClosed)
    }

    /// Enqueue a job. Returns `false` if the consumer is gone.
    pub(crate) fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Box::new(job)).is_ok()
    }

    /// Runtime used for timers armed on behalf of entries.
    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

impl std::fmt::Debug for CallbackContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackContext")
            .field("closed", &self.tx.is_closed())
            .finish_non_exhaustive()
    }
}

async fn dispatch_task(mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            warn!("callback panicked; continuing with next job");
        }
    }
    debug!("callback context drained");
}

// ── NotificationChannel ─────────────────────────────────────────────

/// Single listener slot, last write wins.
///
/// Holds the listener weakly; the caller keeps it alive. Lives inside the
/// entry's locked state.
#[derive(Default)]
pub(crate) struct NotificationChannel {
    listener: Option<Weak<dyn EntryListener>>,
}

impl NotificationChannel {
    pub(crate) fn set(&mut self, listener: Weak<dyn EntryListener>) {
        self.listener = Some(listener);
    }

    pub(crate) fn clear(&mut self) {
        self.listener = None;
    }

    /// A live listener is registered.
    pub(crate) fn is_set(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    pub(crate) fn current(&self) -> Option<Arc<dyn EntryListener>> {
        self.listener.as_ref().and_then(Weak::upgrade)
    }
}
