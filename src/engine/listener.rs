//! Listener contract and registry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::state::LifecycleState;
use super::types::ProgressInfo;
use crate::error::SimulationError;

/// Callback surface notified of everything an engine does.
///
/// Every method has a no-op default; implement the ones you need. All calls
/// happen on the engine's callback thread (see
/// [`CallbackContext`](super::CallbackContext)), one at a time, in the order
/// the events occurred, and never while an engine lock is held.
///
/// For each transition, [`on_state_change`](SimulationListener::on_state_change)
/// is called first, followed by the state-specific method if there is one.
pub trait SimulationListener: Send + Sync {
    fn on_state_change(&self, _from: LifecycleState, _to: LifecycleState, _reason: &str) {}

    /// Entered `INITIALIZING`.
    fn on_init(&self) {}

    /// Entered `READY`.
    fn on_ready(&self) {}

    /// Entered `RUNNING` from `READY`.
    fn on_run(&self) {}

    /// Entered `RUNNING` from `PAUSED`.
    fn on_resume(&self) {}

    /// Entered `PAUSED`.
    fn on_pause(&self) {}

    /// Entered `TERMINATED`.
    fn on_done(&self) {}

    /// Entered `FAILED`.
    fn on_fail(&self, _error: &SimulationError) {}

    /// The worker observed a cancellation request.
    fn on_cancel_requested(&self) {}

    fn on_message(&self, _text: &str) {}

    fn on_progress(&self, _info: &ProgressInfo) {}

    /// The host should redraw. Coalesced to the configured refresh interval.
    fn on_refresh(&self) {}
}

/// Handle returned by `add_listener`, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        ListenerId(raw)
    }
}

#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) id: ListenerId,
    /// First event sequence number this listener receives.
    pub(crate) since: u64,
    pub(crate) listener: Arc<dyn SimulationListener>,
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    entries: RwLock<Vec<Registration>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, listener: Arc<dyn SimulationListener>, since: u64) -> ListenerId {
        let id = ListenerId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push(Registration {
            id,
            since,
            listener,
        });
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|r| r.id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Copy of the current registrations, so callbacks run without the lock.
    pub(crate) fn snapshot(&self) -> Vec<Registration> {
        self.entries.read().clone()
    }
}
