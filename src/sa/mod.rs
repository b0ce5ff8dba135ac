//! Simulated Annealing (SA) on top of the simulation engine.
//!
//! A single-solution trajectory metaheuristic inspired by the physical
//! annealing process. Accepts worsening moves with a probability that
//! decreases over time (temperature), allowing the search to escape
//! local optima.
//!
//! [`AnnealingSimulation`] implements [`Simulation`](crate::engine::Simulation),
//! so an engine can pause, resume and cancel it between moves while
//! listeners observe the best solution through an [`AnnealingMonitor`].
//! [`SaRunner`] runs the same computation headless.
//!
//! # References
//!
//! - Kirkpatrick, Gelatt & Vecchi (1983), "Optimization by Simulated Annealing"
//! - Cerny (1985), "Thermodynamical Approach to the Travelling Salesman Problem"
//! - Lundy & Mees (1986), "Convergence of an Annealing Algorithm"

mod config;
mod heuristic;
mod monitor;
mod runner;
mod schedule;
mod simulation;
mod types;

pub use config::{AnnealingConfig, CoolingSchedule};
pub use heuristic::TemperatureHeuristic;
pub use monitor::{AnnealingMonitor, AnnealingState};
pub use runner::{SaResult, SaRunner};
pub use schedule::{AnnealingSchedule, GeometricSchedule, LinearSchedule, LundyMeesSchedule};
pub use simulation::AnnealingSimulation;
pub use types::{metropolis_probability, AnnealingProblem};
