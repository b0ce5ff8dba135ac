//! Error types shared by the engine and the annealing layer.

use std::fmt;

use thiserror::Error;

/// Boxed error returned by computation callbacks.
///
/// Any `std::error::Error + Send + Sync` converts into it with `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A configuration value failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A single field is outside its admissible range.
    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: String,
    },

    /// Two or more fields contradict each other.
    #[error("{0}")]
    Inconsistent(String),
}

impl ConfigError {
    pub(crate) fn out_of_range(
        field: &'static str,
        requirement: &'static str,
        value: impl fmt::Display,
    ) -> Self {
        ConfigError::OutOfRange {
            field,
            requirement,
            value: value.to_string(),
        }
    }
}

/// Why a run ended in `FAILED`. Delivered to listeners through `on_fail`.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("initialization failed: {0}")]
    Init(#[source] BoxError),

    #[error("step {step} failed: {source}")]
    Step {
        step: u64,
        #[source]
        source: BoxError,
    },

    #[error("simulation panicked during {phase}: {message}")]
    Panicked { phase: &'static str, message: String },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors returned synchronously by [`Engine`](crate::engine::Engine)
/// construction and joining. Control requests never fail.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot join an engine from its own callback thread")]
    JoinFromCallback,

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),
}

/// Errors raised by the simulated annealing layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnealingError {
    #[error("invalid annealing configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("step called before init")]
    NotInitialized,

    #[error("energy must be finite, got {0}")]
    NonFiniteEnergy(f64),
}
