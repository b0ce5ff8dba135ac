//! The engine handle: owns the worker thread and accepts control requests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error};

use super::config::{CallbackContext, EngineConfig};
use super::context::{ContextSnapshot, ExecutionContext};
use super::dispatch::{Dispatcher, EngineEvent, EventPump, EventSink};
use super::listener::{ListenerId, ListenerRegistry, SimulationListener};
use super::state::{AtomicState, LifecycleState};
use super::types::Simulation;
use super::worker::Worker;
use crate::error::{EngineError, SimulationError};

/// Pending control requests. Each kind is last-write-wins.
#[derive(Debug, Default)]
pub(crate) struct ControlRequests {
    pub(crate) run: bool,
    pub(crate) paused: bool,
    pub(crate) stop: bool,
}

/// State shared between the engine handle and its worker.
pub(crate) struct Shared {
    pub(crate) config: EngineConfig,
    pub(crate) state: AtomicState,
    pub(crate) control: Mutex<ControlRequests>,
    pub(crate) wake: Condvar,
    /// Set under the control lock whenever a request changes it.
    pub(crate) dirty: AtomicBool,
    pub(crate) context: ExecutionContext,
    pub(crate) sink: EventSink,
}

impl Shared {
    /// Writes the new state and publishes the transition.
    pub(crate) fn transition(
        &self,
        from: LifecycleState,
        to: LifecycleState,
        reason: impl Into<String>,
        error: Option<Arc<SimulationError>>,
    ) {
        debug_assert!(from.can_transition_to(to), "illegal transition {from} -> {to}");
        self.state.store(to);
        self.context.refresh_elapsed();
        let reason = reason.into();
        debug!(%from, %to, %reason, "state transition");
        self.sink.publish(EngineEvent::StateChanged {
            from,
            to,
            reason,
            error,
        });
    }

    fn request(&self, update: impl FnOnce(&mut ControlRequests)) {
        let mut control = self.control.lock();
        update(&mut control);
        self.dirty.store(true, Ordering::Release);
        self.wake.notify_all();
    }
}

/// Hosts one [`Simulation`] on a dedicated worker thread.
///
/// Every control method is a non-blocking request that may be called from
/// any thread. The worker honors it at its next check point: between two
/// steps, or immediately while it is waiting in `READY` or `PAUSED`. Only the
/// worker changes the state, except for the initial `NEW -> INITIALIZING`
/// edge taken by [`start`](Engine::start). Requests are sticky: a `run()` or
/// `stop()` made before `start()` applies once the worker gets there.
///
/// Observable events reach listeners on the callback thread chosen by
/// [`EngineConfig::callback_context`]. Failures of the computation are only
/// ever reported through [`SimulationListener::on_fail`].
///
/// Besides waiting in `READY` or `PAUSED`, the worker blocks when it
/// publishes a state change or message while the event queue already holds
/// [`EngineConfig::event_capacity`] undelivered events. With
/// [`CallbackContext::Manual`] the host must keep pumping or the run stalls.
///
/// # Examples
///
/// ```
/// use u_simengine::engine::{Engine, EngineConfig, ExecutionContext, Simulation};
/// use u_simengine::BoxError;
///
/// struct Ticks(u32);
///
/// impl Simulation for Ticks {
///     fn init(&mut self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
///         Ok(())
///     }
///     fn step(&mut self, _ctx: &ExecutionContext) -> Result<bool, BoxError> {
///         self.0 += 1;
///         Ok(self.0 < 100)
///     }
/// }
///
/// let engine = Engine::new(Ticks(0), EngineConfig::default().with_auto_run(true)).unwrap();
/// engine.start();
/// engine.join().unwrap();
/// assert_eq!(engine.context().steps, 100);
/// ```
pub struct Engine {
    shared: Arc<Shared>,
    listeners: Arc<ListenerRegistry>,
    simulation: Mutex<Option<Box<dyn Simulation>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    dispatcher_thread: Option<ThreadId>,
    pump: Mutex<Option<EventPump>>,
}

impl Engine {
    /// Creates an engine in `NEW`. With a dedicated callback thread, that
    /// thread is spawned here.
    pub fn new(
        simulation: impl Simulation + 'static,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        Self::build(Box::new(simulation), config, LifecycleState::New)
    }

    pub(crate) fn build(
        simulation: Box<dyn Simulation>,
        config: EngineConfig,
        initial: LifecycleState,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let (sink, rx, refresh) = EventSink::channel(config.event_capacity);
        let listeners = Arc::new(ListenerRegistry::default());
        let dispatcher = Dispatcher::new(rx, Arc::clone(&listeners), refresh, config.refresh_interval);

        let (dispatcher, dispatcher_thread, pump) = match config.callback_context {
            CallbackContext::DedicatedThread => {
                let handle = thread::Builder::new()
                    .name(format!("{}-events", config.name))
                    .spawn(move || dispatcher.run())
                    .map_err(|source| EngineError::Spawn {
                        role: "dispatcher",
                        source,
                    })?;
                let id = handle.thread().id();
                (Some(handle), Some(id), None)
            }
            CallbackContext::Manual => (None, None, Some(EventPump::new(dispatcher))),
        };

        let shared = Arc::new(Shared {
            state: AtomicState::new(initial),
            control: Mutex::new(ControlRequests::default()),
            wake: Condvar::new(),
            dirty: AtomicBool::new(false),
            context: ExecutionContext::attached(sink.clone()),
            sink,
            config,
        });

        Ok(Self {
            shared,
            listeners,
            simulation: Mutex::new(Some(simulation)),
            worker: Mutex::new(None),
            dispatcher: Mutex::new(dispatcher),
            dispatcher_thread,
            pump: Mutex::new(pump),
        })
    }

    /// Requests `NEW -> INITIALIZING` and spawns the worker, which then calls
    /// `init`. Ignored unless the engine is `NEW`.
    pub fn start(&self) {
        let shared = &self.shared;
        if !shared
            .state
            .transition(LifecycleState::New, LifecycleState::Initializing)
        {
            debug!(state = %self.state(), "start ignored");
            return;
        }
        let Some(simulation) = self.simulation.lock().take() else {
            return;
        };

        shared.context.refresh_elapsed();
        debug!(from = %LifecycleState::New, to = %LifecycleState::Initializing, "state transition");
        shared.sink.publish(EngineEvent::StateChanged {
            from: LifecycleState::New,
            to: LifecycleState::Initializing,
            reason: "start requested".to_string(),
            error: None,
        });

        let worker_shared = Arc::clone(shared);
        let spawned = thread::Builder::new()
            .name(format!("{}-worker", shared.config.name))
            .spawn(move || Worker::new(worker_shared, simulation).run());
        match spawned {
            Ok(handle) => *self.worker.lock() = Some(handle),
            Err(source) => {
                let error = SimulationError::Spawn(source);
                error!(%error, "engine failed to start");
                shared.transition(
                    LifecycleState::Initializing,
                    LifecycleState::Failed,
                    error.to_string(),
                    Some(Arc::new(error)),
                );
                shared.sink.publish(EngineEvent::Closed);
            }
        }
    }

    /// Requests `READY -> RUNNING`.
    pub fn run(&self) {
        self.shared.request(|c| c.run = true);
    }

    /// Requests `RUNNING -> PAUSED`.
    pub fn pause(&self) {
        self.shared.request(|c| c.paused = true);
    }

    /// Requests `PAUSED -> RUNNING`. Cancels a pause not yet honored.
    pub fn resume(&self) {
        self.shared.request(|c| c.paused = false);
    }

    /// Requests an orderly end of the run: `TERMINATING`, `shutdown`,
    /// `TERMINATED`.
    pub fn stop(&self) {
        self.shared.request(|c| c.stop = true);
    }

    /// Like [`stop`](Engine::stop), but also sets the context's cancellation
    /// flag and calls the computation's `cancel` hook before `shutdown`.
    pub fn cancel(&self) {
        self.shared.context.request_cancel();
        self.shared.request(|c| c.stop = true);
    }

    /// Asks listeners to redraw, coalesced to the refresh interval.
    pub fn request_refresh(&self) {
        self.shared.sink.request_refresh();
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state.load()
    }

    /// Step count, elapsed time and cancellation flag of the run.
    pub fn context(&self) -> ContextSnapshot {
        self.shared.context.snapshot()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Registers a listener. It sees only events that occur from now on.
    pub fn add_listener(&self, listener: Arc<dyn SimulationListener>) -> ListenerId {
        self.listeners.add(listener, self.shared.sink.next_seq())
    }

    /// Returns `false` if the id was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Hands out the event pump of a [`CallbackContext::Manual`] engine.
    /// Returns `None` for a dedicated callback thread or once taken.
    pub fn take_event_pump(&self) -> Option<EventPump> {
        self.pump.lock().take()
    }

    /// `true` once the worker has exited (or was never started).
    pub fn is_finished(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Blocks until the worker exits and, with a dedicated callback thread,
    /// until every event of the run has been delivered.
    ///
    /// Returns immediately if the engine was never started. Must not be
    /// called from a listener callback. With [`CallbackContext::Manual`],
    /// the host keeps pumping events on its own; joining from the pumping
    /// thread while the queue is full deadlocks.
    pub fn join(&self) -> Result<(), EngineError> {
        if self.dispatcher_thread == Some(thread::current().id()) {
            return Err(EngineError::JoinFromCallback);
        }
        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            handle
                .join()
                .map_err(|_| EngineError::ThreadPanicked("worker"))?;
            let dispatcher = self.dispatcher.lock().take();
            if let Some(handle) = dispatcher {
                handle
                    .join()
                    .map_err(|_| EngineError::ThreadPanicked("dispatcher"))?;
            }
        }
        Ok(())
    }

    /// Publishes `from -> SWITCHING -> NEW` on an engine built in
    /// `SWITCHING`.
    pub(crate) fn complete_switch(&self, from: LifecycleState) {
        self.shared.sink.publish(EngineEvent::StateChanged {
            from,
            to: LifecycleState::Switching,
            reason: "switching simulation".to_string(),
            error: None,
        });
        self.shared.transition(
            LifecycleState::Switching,
            LifecycleState::New,
            "simulation replaced",
            None,
        );
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let active = self.worker.lock().as_ref().is_some_and(|h| !h.is_finished());
        if active {
            debug!(state = %self.state(), "engine dropped while active, cancelling");
            self.cancel();
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.shared.config.name)
            .field("state", &self.state())
            .field("context", &self.context())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
