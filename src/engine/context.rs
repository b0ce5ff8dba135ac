//! Per-run execution context.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use super::dispatch::{EngineEvent, EventSink};
use super::types::ProgressInfo;

/// Mutable per-run record handed to every [`Simulation`](super::Simulation)
/// callback.
///
/// Step count and elapsed time are written by the worker thread only. The
/// cancellation flag is set once by whoever requests cancellation and never
/// cleared. All reads are lock-free.
///
/// A context created with [`detached`](ExecutionContext::detached) is not
/// connected to an engine: posted progress, messages and refresh requests go
/// nowhere. Use it to drive a computation directly on the calling thread.
#[derive(Debug)]
pub struct ExecutionContext {
    steps: AtomicU64,
    elapsed_nanos: AtomicU64,
    cancel_requested: AtomicBool,
    started_at: OnceLock<Instant>,
    sink: Option<EventSink>,
}

/// Point-in-time copy of an [`ExecutionContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub steps: u64,
    pub elapsed: Duration,
    pub cancel_requested: bool,
}

impl ExecutionContext {
    pub fn detached() -> Self {
        Self::with_sink(None)
    }

    pub(crate) fn attached(sink: EventSink) -> Self {
        Self::with_sink(Some(sink))
    }

    fn with_sink(sink: Option<EventSink>) -> Self {
        Self {
            steps: AtomicU64::new(0),
            elapsed_nanos: AtomicU64::new(0),
            cancel_requested: AtomicBool::new(false),
            started_at: OnceLock::new(),
            sink,
        }
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.steps.load(Ordering::Acquire)
    }

    /// Wall-clock time since `RUNNING` was first entered, as of the last
    /// step or transition.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::Acquire))
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            steps: self.step_count(),
            elapsed: self.elapsed(),
            cancel_requested: self.is_cancel_requested(),
        }
    }

    /// Sets the cancellation flag. Idempotent.
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    /// Records one completed step and returns the new count.
    ///
    /// The engine calls this itself; only hosts driving a computation by hand
    /// with a detached context need it.
    pub fn record_step(&self) -> u64 {
        let steps = self.steps.fetch_add(1, Ordering::AcqRel) + 1;
        self.refresh_elapsed();
        steps
    }

    /// Posts a progress tick. Dropped if the event queue is full.
    pub fn post_progress(&self, info: ProgressInfo) {
        if let Some(sink) = &self.sink {
            sink.offer(EngineEvent::Progress(info));
        }
    }

    /// Posts a message. Never dropped; blocks while the event queue is full.
    pub fn post_message(&self, text: impl Into<String>) {
        if let Some(sink) = &self.sink {
            sink.publish(EngineEvent::Message(text.into()));
        }
    }

    /// Asks listeners to redraw. Coalesced with other pending requests.
    pub fn request_refresh(&self) {
        if let Some(sink) = &self.sink {
            sink.request_refresh();
        }
    }

    /// Starts the elapsed clock. Later calls keep the first start.
    pub(crate) fn mark_running(&self) {
        self.started_at.get_or_init(Instant::now);
        self.refresh_elapsed();
    }

    pub(crate) fn refresh_elapsed(&self) {
        if let Some(started) = self.started_at.get() {
            let nanos = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
            self.elapsed_nanos.store(nanos, Ordering::Release);
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::detached()
    }
}
