//! Simulation engine.
//!
//! Runs one steppable [`Simulation`] on a dedicated worker thread and
//! reports everything it does to [`SimulationListener`]s on a single
//! callback thread.
//!
//! # Core Types
//!
//! - [`Simulation`]: the pluggable computation (`init`, `step`, `cancel`,
//!   `shutdown`)
//! - [`Engine`]: owns the worker, accepts non-blocking control requests
//! - [`LifecycleState`]: the run states and their legal transitions
//! - [`ExecutionContext`]: step count, elapsed time and cancellation flag
//!   shared with the computation
//! - [`SimulationListener`]: callbacks for transitions, progress, messages
//!   and refresh requests
//! - [`EngineBridge`]: replaces the computation while keeping subscriptions
//!
//! # Control Model
//!
//! Control is cooperative. A request only records intent and wakes the
//! worker; the worker acts on it between two steps, or at once while it is
//! parked in `READY` or `PAUSED`. A running `step` is never interrupted, so
//! the computation's invariants hold at every transition.

mod bridge;
mod config;
mod context;
mod dispatch;
mod listener;
mod runner;
mod state;
mod types;
mod worker;

pub use bridge::EngineBridge;
pub use config::{CallbackContext, EngineConfig, ProgressInterval};
pub use context::{ContextSnapshot, ExecutionContext};
pub use dispatch::EventPump;
pub use listener::{ListenerId, SimulationListener};
pub use runner::Engine;
pub use state::LifecycleState;
pub use types::{ProgressInfo, Simulation};
