//! Event queue between the worker and the callback thread.
//!
//! The worker (and the thread calling `start`) publish [`EngineEvent`]s into
//! a bounded channel. A [`Dispatcher`] drains it on exactly one thread and
//! calls every registered listener, in FIFO order, without holding any lock.
//! Refresh requests bypass the queue: they set a flag that the dispatcher
//! checks after every event and on a timer, so bursts collapse into one
//! `on_refresh` per refresh interval.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use tracing::{trace, warn};

use super::listener::{ListenerRegistry, SimulationListener};
use super::state::LifecycleState;
use super::types::ProgressInfo;
use crate::error::SimulationError;

#[derive(Debug, Clone)]
pub(crate) enum EngineEvent {
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
        reason: String,
        error: Option<Arc<SimulationError>>,
    },
    CancelRequested,
    Progress(ProgressInfo),
    Message(String),
    /// Nudges the dispatcher to look at the refresh flag.
    Wake,
    /// Last event of a run.
    Closed,
}

#[derive(Debug)]
pub(crate) struct Envelope {
    seq: u64,
    event: EngineEvent,
}

#[derive(Debug, Default)]
pub(crate) struct RefreshGate {
    pending: AtomicBool,
}

/// Producer side of the event queue. Cheap to clone.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: Sender<Envelope>,
    seq: Arc<AtomicU64>,
    refresh: Arc<RefreshGate>,
}

impl EventSink {
    pub(crate) fn channel(capacity: usize) -> (EventSink, Receiver<Envelope>, Arc<RefreshGate>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let refresh = Arc::new(RefreshGate::default());
        let sink = EventSink {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
            refresh: Arc::clone(&refresh),
        };
        (sink, rx, refresh)
    }

    /// Sequence number the next published event will carry.
    pub(crate) fn next_seq(&self) -> u64 {
        self.seq.load(Ordering::Acquire)
    }

    /// Enqueues an event, blocking while the queue is full.
    pub(crate) fn publish(&self, event: EngineEvent) {
        let seq = self.seq.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(Envelope { seq, event }).is_err() {
            trace!("event queue closed, event discarded");
        }
    }

    /// Enqueues an event unless the queue is full.
    pub(crate) fn offer(&self, event: EngineEvent) -> bool {
        let seq = self.seq.fetch_add(1, Ordering::AcqRel);
        match self.tx.try_send(Envelope { seq, event }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!(seq, "event queue full, tick dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub(crate) fn request_refresh(&self) {
        if !self.refresh.pending.swap(true, Ordering::AcqRel) {
            // A full queue means the dispatcher is busy and will see the flag
            // after its next event.
            let _ = self.tx.try_send(Envelope {
                seq: self.next_seq(),
                event: EngineEvent::Wake,
            });
        }
    }
}

/// Consumer side: delivers queued events to listeners.
pub(crate) struct Dispatcher {
    rx: Receiver<Envelope>,
    listeners: Arc<ListenerRegistry>,
    refresh: Arc<RefreshGate>,
    refresh_interval: Duration,
    last_refresh: Option<Instant>,
    closed: bool,
}

impl Dispatcher {
    pub(crate) fn new(
        rx: Receiver<Envelope>,
        listeners: Arc<ListenerRegistry>,
        refresh: Arc<RefreshGate>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            rx,
            listeners,
            refresh,
            refresh_interval,
            last_refresh: None,
            closed: false,
        }
    }

    /// Dedicated-thread loop. Returns once the run has closed or every
    /// producer is gone.
    pub(crate) fn run(mut self) {
        while !self.closed {
            let received = match self.refresh_deadline() {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match self.rx.recv_timeout(wait) {
                        Ok(envelope) => Some(envelope),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.rx.recv() {
                    Ok(envelope) => Some(envelope),
                    Err(_) => break,
                },
            };
            if let Some(envelope) = received {
                self.deliver(envelope);
            }
            self.maybe_refresh(false);
        }
        trace!("dispatcher finished");
    }

    /// Delivers everything queued right now. Returns the number of events.
    pub(crate) fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while !self.closed {
            match self.rx.try_recv() {
                Ok(envelope) => {
                    self.deliver(envelope);
                    delivered += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        self.maybe_refresh(false);
        delivered
    }

    /// Waits up to `timeout` for the first event, then drains the queue.
    pub(crate) fn dispatch_timeout(&mut self, timeout: Duration) -> usize {
        if self.closed {
            return 0;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(envelope) => {
                self.deliver(envelope);
                1 + self.dispatch_pending()
            }
            Err(RecvTimeoutError::Timeout) => {
                self.maybe_refresh(false);
                0
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.closed = true;
                0
            }
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    /// When a pending refresh becomes due, if there is one.
    pub(crate) fn refresh_deadline(&self) -> Option<Instant> {
        if !self.refresh.pending.load(Ordering::Acquire) {
            return None;
        }
        Some(match self.last_refresh {
            Some(last) => last + self.refresh_interval,
            None => Instant::now(),
        })
    }

    fn maybe_refresh(&mut self, force: bool) {
        let Some(deadline) = self.refresh_deadline() else {
            return;
        };
        let now = Instant::now();
        if !force && now < deadline {
            return;
        }
        // Cleared before delivery: a request made during the callbacks earns
        // another refresh.
        self.refresh.pending.store(false, Ordering::Release);
        self.last_refresh = Some(now);
        for registration in self.listeners.snapshot() {
            guard_callback(|| registration.listener.on_refresh());
        }
    }

    fn deliver(&mut self, envelope: Envelope) {
        let Envelope { seq, event } = envelope;
        match event {
            EngineEvent::Wake => {}
            EngineEvent::Closed => {
                self.closed = true;
                self.maybe_refresh(true);
            }
            event => {
                for registration in self.listeners.snapshot() {
                    if seq >= registration.since {
                        let listener = registration.listener.as_ref();
                        guard_callback(|| notify(listener, &event));
                    }
                }
            }
        }
    }
}

/// Host-driven event delivery, for [`CallbackContext::Manual`](super::CallbackContext::Manual).
///
/// Call [`dispatch_pending`](EventPump::dispatch_pending) regularly from the
/// thread that should run the callbacks (typically once per UI frame).
pub struct EventPump {
    dispatcher: Dispatcher,
}

impl EventPump {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Delivers every queued event and any due refresh. Never blocks.
    pub fn dispatch_pending(&mut self) -> usize {
        self.dispatcher.dispatch_pending()
    }

    /// Like [`dispatch_pending`](EventPump::dispatch_pending), but first waits
    /// up to `timeout` for an event to arrive.
    pub fn dispatch_timeout(&mut self, timeout: Duration) -> usize {
        self.dispatcher.dispatch_timeout(timeout)
    }

    /// When a coalesced refresh will be due, so a host loop can schedule its
    /// next pump.
    pub fn next_refresh_at(&self) -> Option<Instant> {
        self.dispatcher.refresh_deadline()
    }

    /// `true` once the run's final event has been delivered.
    pub fn is_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }
}

fn notify(listener: &dyn SimulationListener, event: &EngineEvent) {
    match event {
        EngineEvent::StateChanged {
            from,
            to,
            reason,
            error,
        } => {
            listener.on_state_change(*from, *to, reason);
            match to {
                LifecycleState::Initializing => listener.on_init(),
                LifecycleState::Ready => listener.on_ready(),
                LifecycleState::Running if *from == LifecycleState::Paused => listener.on_resume(),
                LifecycleState::Running => listener.on_run(),
                LifecycleState::Paused => listener.on_pause(),
                LifecycleState::Terminated => listener.on_done(),
                LifecycleState::Failed => {
                    if let Some(error) = error {
                        listener.on_fail(error);
                    }
                }
                _ => {}
            }
        }
        EngineEvent::CancelRequested => listener.on_cancel_requested(),
        EngineEvent::Progress(info) => listener.on_progress(info),
        EngineEvent::Message(text) => listener.on_message(text),
        EngineEvent::Wake | EngineEvent::Closed => {}
    }
}

/// Runs one listener callback, containing any panic.
fn guard_callback(callback: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
        warn!(panic = %panic_message(payload.as_ref()), "listener panicked");
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
