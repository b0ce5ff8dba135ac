//! Data-driven initial temperature.

use rand::Rng;

use super::types::{metropolis_probability, AnnealingProblem};
use crate::error::{AnnealingError, ConfigError};

/// Estimates the initial temperature `T0` from sampled moves.
///
/// Draws `samples` random moves from the starting solution, measures each
/// move's energy change, and picks the `T0` at which the mean Metropolis
/// acceptance probability over the sample equals `target_acceptance`. The
/// result never drops below `epsilon`, which also stands in when the sample
/// contains no (or only negligible) uphill moves.
///
/// # Examples
///
/// ```
/// use u_simengine::sa::TemperatureHeuristic;
///
/// let heuristic = TemperatureHeuristic::default().with_target_acceptance(0.5);
/// let t0 = heuristic.temperature_for(&[1.0, 1.0, 1.0, 1.0]);
/// // exp(-1 / t0) = 0.5
/// assert!((t0 - 1.0 / std::f64::consts::LN_2).abs() < 1e-6);
/// ```
///
/// # References
///
/// Kirkpatrick et al. (1983); Ben-Ameur (2004), "Computing the Initial
/// Temperature of Simulated Annealing"
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TemperatureHeuristic {
    /// Number of sampled moves.
    pub samples: usize,

    /// Desired mean acceptance probability at `T0`, in (0, 1).
    pub target_acceptance: f64,

    /// Floor for `T0`.
    pub epsilon: f64,
}

impl Default for TemperatureHeuristic {
    fn default() -> Self {
        Self {
            samples: 100,
            target_acceptance: 0.8,
            epsilon: 1e-6,
        }
    }
}

impl TemperatureHeuristic {
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_target_acceptance(mut self, target: f64) -> Self {
        self.target_acceptance = target;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::out_of_range("heuristic.samples", "positive", 0));
        }
        if !(self.target_acceptance > 0.0 && self.target_acceptance < 1.0) {
            return Err(ConfigError::out_of_range(
                "heuristic.target_acceptance",
                "in (0, 1)",
                self.target_acceptance,
            ));
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(ConfigError::out_of_range(
                "heuristic.epsilon",
                "positive and finite",
                self.epsilon,
            ));
        }
        Ok(())
    }

    /// Samples moves around `start` and returns the estimated `T0`.
    pub fn estimate<P: AnnealingProblem, R: Rng>(
        &self,
        problem: &P,
        start: &P::Solution,
        rng: &mut R,
    ) -> Result<f64, AnnealingError> {
        let start_energy = problem.energy(start);
        if !start_energy.is_finite() {
            return Err(AnnealingError::NonFiniteEnergy(start_energy));
        }
        let moves: Vec<P::Move> = (0..self.samples)
            .map(|_| problem.random_move(rng, start))
            .collect();
        let deltas = measure_deltas(problem, start, start_energy, &moves);
        if let Some(&bad) = deltas.iter().find(|d| !d.is_finite()) {
            return Err(AnnealingError::NonFiniteEnergy(bad));
        }
        Ok(self.temperature_for(&deltas))
    }

    /// `T0` for a sample of energy changes.
    pub fn temperature_for(&self, deltas: &[f64]) -> f64 {
        let uphill: Vec<f64> = deltas.iter().copied().filter(|&d| d > 0.0).collect();
        if uphill.is_empty() {
            return self.epsilon;
        }
        let mean_uphill = uphill.iter().sum::<f64>() / uphill.len() as f64;
        if mean_uphill < self.epsilon {
            return self.epsilon;
        }

        // Downhill moves contribute probability 1 each; the uphill ones must
        // make up the rest of the target.
        let downhill = (deltas.len() - uphill.len()) as f64;
        let required = self.target_acceptance * deltas.len() as f64 - downhill;
        if required <= 0.0 {
            return (mean_uphill / -self.target_acceptance.ln()).max(self.epsilon);
        }
        let accepted = |t: f64| -> f64 { uphill.iter().map(|&d| metropolis_probability(d, t)).sum() };

        let mut lo = self.epsilon;
        let mut hi = mean_uphill.max(self.epsilon);
        // `accepted` tends to `uphill.len()` > `required` as T grows.
        for _ in 0..1100 {
            if accepted(hi) >= required {
                break;
            }
            lo = hi;
            hi *= 2.0;
        }
        for _ in 0..100 {
            let mid = 0.5 * (lo + hi);
            if accepted(mid) < required {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi.max(self.epsilon)
    }

    /// Mean Metropolis acceptance probability of `deltas` at `temperature`.
    pub fn mean_acceptance(deltas: &[f64], temperature: f64) -> f64 {
        if deltas.is_empty() {
            return 0.0;
        }
        deltas
            .iter()
            .map(|&d| metropolis_probability(d, temperature))
            .sum::<f64>()
            / deltas.len() as f64
    }
}

#[cfg(not(feature = "parallel"))]
fn measure_deltas<P: AnnealingProblem>(
    problem: &P,
    start: &P::Solution,
    start_energy: f64,
    moves: &[P::Move],
) -> Vec<f64> {
    moves
        .iter()
        .map(|mv| move_delta(problem, start, start_energy, mv))
        .collect()
}

#[cfg(feature = "parallel")]
fn measure_deltas<P: AnnealingProblem>(
    problem: &P,
    start: &P::Solution,
    start_energy: f64,
    moves: &[P::Move],
) -> Vec<f64> {
    use rayon::prelude::*;

    moves
        .par_iter()
        .map(|mv| move_delta(problem, start, start_energy, mv))
        .collect()
}

fn move_delta<P: AnnealingProblem>(
    problem: &P,
    start: &P::Solution,
    start_energy: f64,
    mv: &P::Move,
) -> f64 {
    let mut candidate = start.clone();
    problem.apply_move(&mut candidate, mv);
    problem.energy(&candidate) - start_energy
}
