//! Cooperative simulation engine with a Simulated Annealing workload.
//!
//! Hosts one long-running, steppable computation on a worker thread and
//! exposes a small, non-blocking control surface around it:
//!
//! - **Engine**: lifecycle state machine (`NEW` → `INITIALIZING` → `READY`
//!   → `RUNNING` ⇄ `PAUSED` → `TERMINATING` → `TERMINATED`, or `FAILED`),
//!   cooperative run/pause/resume/stop/cancel requests, execution context,
//!   and listener callbacks delivered in order on a single callback thread.
//! - **Simulated Annealing (SA)**: a Metropolis-criterion optimizer over a
//!   user-supplied solution space, with pluggable cooling schedules and a
//!   data-driven initial temperature, runnable inside the engine or
//!   headless.
//!
//! # Architecture
//!
//! The engine knows nothing about optimization: it drives any
//! [`engine::Simulation`]. The SA layer is one such simulation and contains
//! no domain concepts; tours, schedules, layouts and the like are defined by
//! consumers through [`sa::AnnealingProblem`].
//!
//! # Examples
//!
//! ```
//! use u_simengine::engine::{Engine, EngineConfig, LifecycleState};
//! use u_simengine::sa::{AnnealingConfig, AnnealingProblem, AnnealingSimulation};
//! use rand::Rng;
//!
//! struct Parabola;
//!
//! impl AnnealingProblem for Parabola {
//!     type Solution = f64;
//!     type Move = f64;
//!
//!     fn random_solution<R: Rng>(&self, rng: &mut R) -> f64 {
//!         rng.random_range(-10.0..10.0)
//!     }
//!     fn energy(&self, x: &f64) -> f64 {
//!         x * x
//!     }
//!     fn random_move<R: Rng>(&self, rng: &mut R, _x: &f64) -> f64 {
//!         rng.random_range(-1.0..1.0)
//!     }
//!     fn apply_move(&self, x: &mut f64, offset: &f64) {
//!         *x += offset;
//!     }
//! }
//!
//! let config = AnnealingConfig::default().with_seed(7).with_max_steps(5_000);
//! let simulation = AnnealingSimulation::new(Parabola, config).unwrap();
//! let monitor = simulation.monitor();
//!
//! let engine = Engine::new(simulation, EngineConfig::default().with_auto_run(true)).unwrap();
//! engine.start();
//! engine.join().unwrap();
//!
//! assert_eq!(engine.state(), LifecycleState::Terminated);
//! assert!(monitor.best_energy().unwrap() < 1.0);
//! ```

pub mod engine;
pub mod error;
pub mod sa;

pub use error::{AnnealingError, BoxError, ConfigError, EngineError, SimulationError};
