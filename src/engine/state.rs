//! Lifecycle states and the legal transition graph.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Run state of an [`Engine`](super::Engine).
///
/// ```text
/// NEW ──start──► INITIALIZING ──init ok──► READY ──run / auto-run──► RUNNING ◄──resume── PAUSED
///                    │    │                  │                         │  │ ──pause──►   │
///                    │    └──init fails──►FAILED◄──step fails──────────┘  │              │
///                    └──────────────┬────────┴──────── stop / cancel ─────┴──────────────┘
///                                   ▼
///                              TERMINATING ──shutdown──► TERMINATED
///
/// NEW | TERMINATED | FAILED ──► SWITCHING ──► NEW      (host replaces the computation)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum LifecycleState {
    New,
    Initializing,
    Ready,
    Running,
    Paused,
    Switching,
    Terminating,
    Terminated,
    Failed,
}

impl LifecycleState {
    /// Every state, in declaration order.
    pub const ALL: [LifecycleState; 9] = [
        LifecycleState::New,
        LifecycleState::Initializing,
        LifecycleState::Ready,
        LifecycleState::Running,
        LifecycleState::Paused,
        LifecycleState::Switching,
        LifecycleState::Terminating,
        LifecycleState::Terminated,
        LifecycleState::Failed,
    ];

    /// `TERMINATED` or `FAILED`.
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Terminated | LifecycleState::Failed)
    }

    /// Whether the worker thread owns the computation in this state.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            LifecycleState::Initializing
                | LifecycleState::Ready
                | LifecycleState::Running
                | LifecycleState::Paused
                | LifecycleState::Terminating
        )
    }

    /// Returns `true` if `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (New, Initializing)
                | (Initializing, Ready | Terminating | Failed)
                | (Ready, Running | Terminating)
                | (Running, Paused | Terminating | Failed)
                | (Paused, Running | Terminating)
                | (Terminating, Terminated)
                | (New | Terminated | Failed, Switching)
                | (Switching, New)
        )
    }

    /// Upper-case name, as used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::New => "NEW",
            LifecycleState::Initializing => "INITIALIZING",
            LifecycleState::Ready => "READY",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Paused => "PAUSED",
            LifecycleState::Switching => "SWITCHING",
            LifecycleState::Terminating => "TERMINATING",
            LifecycleState::Terminated => "TERMINATED",
            LifecycleState::Failed => "FAILED",
        }
    }

    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(raw: u8) -> Self {
        Self::ALL[raw as usize]
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free cell holding the current state: written by one thread at a
/// time, read by any.
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: LifecycleState) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    pub(crate) fn load(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: LifecycleState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Moves `from -> to` only if the current state is `from`.
    pub(crate) fn transition(&self, from: LifecycleState, to: LifecycleState) -> bool {
        self.0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
