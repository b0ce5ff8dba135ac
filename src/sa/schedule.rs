//! Cooling schedules.

use std::fmt;

/// Temperature policy of an annealing run.
///
/// The simulation holds each temperature for
/// `iterations_per_temperature` steps, then asks the schedule for the next
/// one. The run finishes normally as soon as the schedule reports the
/// temperature frozen.
pub trait AnnealingSchedule: Send + fmt::Debug {
    /// Called once, after the initial temperature is fixed. `levels` is the
    /// expected number of temperature levels, or `None` without a step
    /// budget.
    fn calibrate(&mut self, _initial_temperature: f64, _levels: Option<u64>) {}

    /// Temperature of the next level.
    fn next_temperature(&mut self, temperature: f64) -> f64;

    /// Whether the run should stop at this temperature.
    fn is_frozen(&self, temperature: f64) -> bool;
}

/// Geometric (exponential) cooling: `T_{k+1} = alpha * T_k`.
///
/// Most widely used. Typical `alpha`: 0.95–0.99.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricSchedule {
    /// Cooling factor in (0, 1). Higher = slower cooling.
    pub alpha: f64,
    /// Frozen at or below this temperature.
    pub min_temperature: f64,
}

impl AnnealingSchedule for GeometricSchedule {
    fn next_temperature(&mut self, temperature: f64) -> f64 {
        temperature * self.alpha
    }

    fn is_frozen(&self, temperature: f64) -> bool {
        temperature <= self.min_temperature
    }
}

/// Linear cooling: `T_k = T_0 - k * (T_0 - T_min) / levels`.
///
/// Fixed total duration. Without a step budget, 1000 levels are assumed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSchedule {
    pub min_temperature: f64,
    initial_temperature: f64,
    levels: u64,
    level: u64,
}

impl LinearSchedule {
    pub const DEFAULT_LEVELS: u64 = 1000;

    pub fn new(min_temperature: f64) -> Self {
        Self {
            min_temperature,
            initial_temperature: min_temperature,
            levels: Self::DEFAULT_LEVELS,
            level: 0,
        }
    }
}

impl AnnealingSchedule for LinearSchedule {
    fn calibrate(&mut self, initial_temperature: f64, levels: Option<u64>) {
        self.initial_temperature = initial_temperature;
        self.levels = levels.filter(|&l| l > 0).unwrap_or(Self::DEFAULT_LEVELS);
        self.level = 0;
    }

    fn next_temperature(&mut self, _temperature: f64) -> f64 {
        self.level += 1;
        let span = self.initial_temperature - self.min_temperature;
        let t = self.initial_temperature - self.level as f64 * span / self.levels as f64;
        t.max(self.min_temperature)
    }

    fn is_frozen(&self, temperature: f64) -> bool {
        temperature <= self.min_temperature
    }
}

/// Lundy-Mees cooling: `T_{k+1} = T_k / (1 + beta * T_k)`.
///
/// Cools fast at high T, slow at low T. Has a convergence proof.
///
/// Reference: Lundy & Mees (1986)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LundyMeesSchedule {
    /// Typically `(T_0 - T_min) / (levels * T_0 * T_min)`.
    pub beta: f64,
    pub min_temperature: f64,
}

impl AnnealingSchedule for LundyMeesSchedule {
    fn next_temperature(&mut self, temperature: f64) -> f64 {
        temperature / (1.0 + self.beta * temperature)
    }

    fn is_frozen(&self, temperature: f64) -> bool {
        temperature <= self.min_temperature
    }
}
