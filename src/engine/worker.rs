//! Worker loop: drives a simulation through the lifecycle.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info_span, trace, warn};

use super::config::ProgressInterval;
use super::dispatch::{panic_message, EngineEvent};
use super::runner::Shared;
use super::state::LifecycleState;
use super::types::Simulation;
use crate::error::{BoxError, SimulationError};

/// Outcome of one guarded computation callback.
enum CallError {
    Failed(BoxError),
    Panicked(String),
}

fn guarded<T>(call: impl FnOnce() -> Result<T, BoxError>) -> Result<T, CallError> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(CallError::Failed(err)),
        Err(payload) => Err(CallError::Panicked(panic_message(payload.as_ref()))),
    }
}

/// What the worker found at a check point.
enum Directive {
    Continue,
    Pause,
    Stop,
}

pub(crate) struct Worker {
    shared: Arc<Shared>,
    simulation: Box<dyn Simulation>,
    last_progress: Instant,
}

impl Worker {
    pub(crate) fn new(shared: Arc<Shared>, simulation: Box<dyn Simulation>) -> Self {
        Self {
            shared,
            simulation,
            last_progress: Instant::now(),
        }
    }

    pub(crate) fn run(mut self) {
        let span = info_span!("engine", name = %self.shared.config.name, simulation = %self.simulation.name());
        let _entered = span.enter();

        self.drive();
        self.shared.sink.publish(EngineEvent::Closed);
    }

    fn drive(&mut self) {
        let init = guarded(|| self.simulation.init(&self.shared.context));
        if let Err(err) = init {
            let error = match err {
                CallError::Failed(source) => SimulationError::Init(source),
                CallError::Panicked(message) => SimulationError::Panicked {
                    phase: "init",
                    message,
                },
            };
            return self.fail(LifecycleState::Initializing, error);
        }
        if self.shared.control.lock().stop {
            return self.terminate(LifecycleState::Initializing);
        }

        self.shared.transition(
            LifecycleState::Initializing,
            LifecycleState::Ready,
            "initialized",
            None,
        );
        if !self.await_run() {
            return self.terminate(LifecycleState::Ready);
        }

        self.shared.context.mark_running();
        let reason = if self.shared.config.auto_run {
            "auto-run"
        } else {
            "run requested"
        };
        self.shared
            .transition(LifecycleState::Ready, LifecycleState::Running, reason, None);
        self.last_progress = Instant::now();

        loop {
            if self.shared.dirty.swap(false, Ordering::AcqRel) {
                match self.check_point() {
                    Directive::Continue => {}
                    Directive::Stop => return self.terminate(LifecycleState::Running),
                    Directive::Pause => {
                        self.shared.transition(
                            LifecycleState::Running,
                            LifecycleState::Paused,
                            "pause requested",
                            None,
                        );
                        if !self.await_resume() {
                            return self.terminate(LifecycleState::Paused);
                        }
                        self.shared.transition(
                            LifecycleState::Paused,
                            LifecycleState::Running,
                            "resume requested",
                            None,
                        );
                        continue;
                    }
                }
            }

            let outcome = guarded(|| self.simulation.step(&self.shared.context));
            match outcome {
                Ok(keep_going) => {
                    let steps = self.shared.context.record_step();
                    self.emit_progress(steps);
                    if !keep_going {
                        return self.complete();
                    }
                }
                Err(err) => {
                    let step = self.shared.context.step_count() + 1;
                    let error = match err {
                        CallError::Failed(source) => SimulationError::Step { step, source },
                        CallError::Panicked(message) => SimulationError::Panicked {
                            phase: "step",
                            message,
                        },
                    };
                    return self.fail(LifecycleState::Running, error);
                }
            }

            self.cooperative_yield();
        }
    }

    fn check_point(&self) -> Directive {
        let control = self.shared.control.lock();
        if control.stop {
            Directive::Stop
        } else if control.paused {
            Directive::Pause
        } else {
            Directive::Continue
        }
    }

    /// Blocks in `READY`. Returns `false` if the run should end instead.
    fn await_run(&self) -> bool {
        let auto_run = self.shared.config.auto_run;
        let mut control = self.shared.control.lock();
        loop {
            if control.stop {
                return false;
            }
            if control.run || auto_run {
                return true;
            }
            self.shared.wake.wait(&mut control);
        }
    }

    /// Blocks in `PAUSED`. Returns `false` if the run should end instead.
    fn await_resume(&self) -> bool {
        let mut control = self.shared.control.lock();
        loop {
            if control.stop {
                return false;
            }
            if !control.paused {
                return true;
            }
            self.shared.wake.wait(&mut control);
        }
    }

    /// Sleeps for the yield interval unless a request arrives first.
    fn cooperative_yield(&self) {
        let interval = self.shared.config.yield_interval;
        if interval.is_zero() {
            return;
        }
        let mut control = self.shared.control.lock();
        if !self.shared.dirty.load(Ordering::Acquire) {
            self.shared.wake.wait_for(&mut control, interval);
        }
    }

    fn emit_progress(&mut self, steps: u64) {
        let due = match self.shared.config.progress_interval {
            ProgressInterval::Steps(every) => steps % every == 0,
            ProgressInterval::Elapsed(every) => self.last_progress.elapsed() >= every,
            ProgressInterval::Disabled => false,
        };
        if due {
            self.last_progress = Instant::now();
            let info = self.simulation.progress(&self.shared.context);
            self.shared.sink.offer(EngineEvent::Progress(info));
        }
    }

    /// `step` reported normal completion.
    fn complete(&mut self) {
        self.shared.transition(
            LifecycleState::Running,
            LifecycleState::Terminating,
            "simulation completed",
            None,
        );
        self.shutdown();
        self.shared.transition(
            LifecycleState::Terminating,
            LifecycleState::Terminated,
            "shutdown complete",
            None,
        );
    }

    /// Stop or cancel was requested.
    fn terminate(&mut self, from: LifecycleState) {
        let cancelled = self.shared.context.is_cancel_requested();
        if cancelled {
            self.shared.sink.publish(EngineEvent::CancelRequested);
            let result = guarded(|| self.simulation.cancel(&self.shared.context));
            swallow("cancel", result);
        }
        let reason = if cancelled {
            "cancel requested"
        } else {
            "stop requested"
        };
        self.shared
            .transition(from, LifecycleState::Terminating, reason, None);
        self.shutdown();
        self.shared.transition(
            LifecycleState::Terminating,
            LifecycleState::Terminated,
            "shutdown complete",
            None,
        );
    }

    fn fail(&mut self, from: LifecycleState, error: SimulationError) {
        error!(%error, steps = self.shared.context.step_count(), "simulation failed");
        self.shutdown();
        self.shared.transition(
            from,
            LifecycleState::Failed,
            error.to_string(),
            Some(Arc::new(error)),
        );
    }

    fn shutdown(&mut self) {
        let result = guarded(|| self.simulation.shutdown(&self.shared.context));
        swallow("shutdown", result);
        trace!("shutdown invoked");
    }
}

fn swallow(phase: &'static str, result: Result<(), CallError>) {
    match result {
        Ok(()) => {}
        Err(CallError::Failed(err)) => warn!(phase, error = %err, "cleanup failed, ignored"),
        Err(CallError::Panicked(message)) => {
            warn!(phase, panic = %message, "cleanup panicked, ignored")
        }
    }
}
