//! The computation contract hosted by the engine.

use super::context::ExecutionContext;
use crate::error::BoxError;

/// A steppable computation hosted by an [`Engine`](super::Engine).
///
/// All methods run on the engine's worker thread, one at a time:
///
/// - [`init`](Simulation::init) is called at most once. An error fails the
///   run and is not retried.
/// - [`step`](Simulation::step) performs one bounded unit of work and returns
///   `Ok(false)` once the computation has finished normally.
/// - [`cancel`](Simulation::cancel) is a best-effort hint, invoked once after
///   a cancellation request is observed, between two steps.
/// - [`shutdown`](Simulation::shutdown) is invoked exactly once iff `init`
///   was attempted, whatever the outcome of the run.
///
/// Errors from `cancel` and `shutdown` are logged and swallowed. A panic in
/// any callback is caught and treated like an error.
///
/// The engine never preempts `step`: a step that never returns stalls the
/// run, including its cancellation. [`ExecutionContext::post_message`] blocks
/// while the event queue is full, so a step that posts messages also waits
/// for the listeners to catch up. Progress ticks and refresh requests never
/// block.
///
/// # Examples
///
/// ```
/// use u_simengine::engine::{ExecutionContext, Simulation};
/// use u_simengine::BoxError;
///
/// struct Countdown(u32);
///
/// impl Simulation for Countdown {
///     fn init(&mut self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
///         Ok(())
///     }
///
///     fn step(&mut self, _ctx: &ExecutionContext) -> Result<bool, BoxError> {
///         self.0 = self.0.saturating_sub(1);
///         Ok(self.0 > 0)
///     }
/// }
/// ```
pub trait Simulation: Send {
    /// One-time setup.
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), BoxError>;

    /// Performs one unit of work. `Ok(false)` signals normal completion.
    fn step(&mut self, ctx: &ExecutionContext) -> Result<bool, BoxError>;

    /// Asks the computation to wind down after a cancellation request.
    fn cancel(&mut self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Releases resources at the end of the run.
    fn shutdown(&mut self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Payload of engine-driven progress ticks.
    fn progress(&self, _ctx: &ExecutionContext) -> ProgressInfo {
        ProgressInfo::indeterminate()
    }

    /// Label used in logs.
    fn name(&self) -> &str {
        "simulation"
    }
}

impl<T: Simulation + ?Sized> Simulation for Box<T> {
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        (**self).init(ctx)
    }

    fn step(&mut self, ctx: &ExecutionContext) -> Result<bool, BoxError> {
        (**self).step(ctx)
    }

    fn cancel(&mut self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        (**self).cancel(ctx)
    }

    fn shutdown(&mut self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        (**self).shutdown(ctx)
    }

    fn progress(&self, ctx: &ExecutionContext) -> ProgressInfo {
        (**self).progress(ctx)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// One progress tick: a completion fraction or an indeterminate marker,
/// plus an optional human-readable message.
///
/// Algorithm-specific diagnostics travel in the message or through
/// accessors on the computation itself.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressInfo {
    /// Fraction complete in `[0, 1]`, or `None` when indeterminate.
    pub fraction: Option<f64>,

    /// Optional status line.
    pub message: Option<String>,
}

impl ProgressInfo {
    /// Determinate progress. The fraction is clamped into `[0, 1]`; NaN
    /// becomes indeterminate.
    pub fn determinate(fraction: f64) -> Self {
        Self {
            fraction: (!fraction.is_nan()).then(|| fraction.clamp(0.0, 1.0)),
            message: None,
        }
    }

    pub fn indeterminate() -> Self {
        Self {
            fraction: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_indeterminate(&self) -> bool {
        self.fraction.is_none()
    }
}
