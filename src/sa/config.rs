//! SA configuration and cooling selection.

use super::heuristic::TemperatureHeuristic;
use super::schedule::{AnnealingSchedule, GeometricSchedule, LinearSchedule, LundyMeesSchedule};
use crate::error::ConfigError;

/// Built-in cooling schedule for temperature reduction.
///
/// # References
///
/// - Geometric: standard textbook approach
/// - Linear: fixed-duration cooling
/// - LundyMees: Lundy & Mees (1986), with convergence proof
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoolingSchedule {
    /// Geometric (exponential) cooling: `T_{k+1} = alpha * T_k`.
    Geometric {
        /// Cooling factor in (0, 1). Higher = slower cooling.
        alpha: f64,
    },

    /// Linear cooling from `T_0` to the minimum temperature over the step
    /// budget.
    Linear,

    /// Lundy-Mees cooling: `T_{k+1} = T_k / (1 + beta * T_k)`.
    LundyMees {
        /// Cooling parameter. Typically `(T_0 - T_min) / (levels * T_0 * T_min)`.
        beta: f64,
    },
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        CoolingSchedule::Geometric { alpha: 0.95 }
    }
}

impl CoolingSchedule {
    /// Instantiates the schedule with the given freezing floor.
    pub fn build(self, min_temperature: f64) -> Box<dyn AnnealingSchedule> {
        match self {
            CoolingSchedule::Geometric { alpha } => Box::new(GeometricSchedule {
                alpha,
                min_temperature,
            }),
            CoolingSchedule::Linear => Box::new(LinearSchedule::new(min_temperature)),
            CoolingSchedule::LundyMees { beta } => Box::new(LundyMeesSchedule {
                beta,
                min_temperature,
            }),
        }
    }
}

/// Configuration for a Simulated Annealing run.
///
/// # Examples
///
/// ```
/// use u_simengine::sa::{AnnealingConfig, CoolingSchedule};
///
/// let config = AnnealingConfig::default()
///     .with_min_temperature(0.001)
///     .with_cooling(CoolingSchedule::Geometric { alpha: 0.98 })
///     .with_iterations_per_temperature(200)
///     .with_max_steps(100_000)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnnealingConfig {
    /// Fixed initial temperature. `None` estimates it with `heuristic`
    /// during init.
    pub initial_temperature: Option<f64>,

    /// Minimum temperature. The run completes when T drops to it.
    pub min_temperature: f64,

    /// Cooling schedule.
    pub cooling: CoolingSchedule,

    /// Number of steps at each temperature level.
    pub iterations_per_temperature: u64,

    /// Maximum total steps (hard budget). 0 = no limit.
    pub max_steps: u64,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,

    /// Post a progress tick and a refresh request every this many steps.
    /// 0 = never.
    pub report_interval: u64,

    /// Initial-temperature estimator.
    pub heuristic: TemperatureHeuristic,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: None,
            min_temperature: 1e-6,
            cooling: CoolingSchedule::default(),
            iterations_per_temperature: 100,
            max_steps: 0,
            seed: None,
            report_interval: 1000,
            heuristic: TemperatureHeuristic::default(),
        }
    }
}

impl AnnealingConfig {
    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = Some(t);
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_cooling(mut self, cooling: CoolingSchedule) -> Self {
        self.cooling = cooling;
        self
    }

    pub fn with_iterations_per_temperature(mut self, n: u64) -> Self {
        self.iterations_per_temperature = n;
        self
    }

    pub fn with_max_steps(mut self, n: u64) -> Self {
        self.max_steps = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_report_interval(mut self, n: u64) -> Self {
        self.report_interval = n;
        self
    }

    pub fn with_heuristic(mut self, heuristic: TemperatureHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    /// Expected number of temperature levels, when a step budget exists.
    pub fn levels(&self) -> Option<u64> {
        (self.max_steps > 0).then(|| self.max_steps / self.iterations_per_temperature.max(1))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_temperature > 0.0 && self.min_temperature.is_finite()) {
            return Err(ConfigError::out_of_range(
                "min_temperature",
                "positive and finite",
                self.min_temperature,
            ));
        }
        if let Some(t0) = self.initial_temperature {
            if !(t0 > 0.0 && t0.is_finite()) {
                return Err(ConfigError::out_of_range(
                    "initial_temperature",
                    "positive and finite",
                    t0,
                ));
            }
            if self.min_temperature >= t0 {
                return Err(ConfigError::Inconsistent(
                    "min_temperature must be less than initial_temperature".into(),
                ));
            }
        }
        if self.iterations_per_temperature == 0 {
            return Err(ConfigError::out_of_range(
                "iterations_per_temperature",
                "positive",
                0,
            ));
        }
        match self.cooling {
            CoolingSchedule::Geometric { alpha } => {
                if alpha <= 0.0 || alpha >= 1.0 {
                    return Err(ConfigError::out_of_range("geometric alpha", "in (0, 1)", alpha));
                }
            }
            CoolingSchedule::LundyMees { beta } => {
                if beta <= 0.0 {
                    return Err(ConfigError::out_of_range("lundy-mees beta", "positive", beta));
                }
            }
            CoolingSchedule::Linear => {}
        }
        if self.initial_temperature.is_none() {
            self.heuristic.validate()?;
        }
        Ok(())
    }
}
