//! Headless SA execution loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::config::AnnealingConfig;
use super::simulation::AnnealingSimulation;
use super::types::AnnealingProblem;
use crate::engine::ExecutionContext;
use crate::error::AnnealingError;

/// Result of a Simulated Annealing run.
#[derive(Debug, Clone)]
pub struct SaResult<S: Clone> {
    /// The best solution found.
    pub best: S,

    /// Energy of the best solution.
    pub best_energy: f64,

    /// Total number of steps (neighbor evaluations).
    pub steps: u64,

    /// Temperature when the run stopped.
    pub final_temperature: f64,

    /// Temperature the run started at.
    pub initial_temperature: f64,

    /// Number of accepted moves (including improvements).
    pub accepted_moves: u64,

    /// Number of accepted moves that increased the energy.
    pub uphill_moves: u64,

    /// Number of improving moves.
    pub improving_moves: u64,

    /// Whether cancelled externally.
    pub cancelled: bool,

    /// Best energy sampled at regular intervals for history tracking.
    pub energy_history: Vec<f64>,
}

/// Runs Simulated Annealing to completion on the calling thread.
///
/// Uses the same [`AnnealingSimulation`] the engine hosts, without worker
/// threads, listeners or lifecycle. Handy for batch use and benchmarks.
pub struct SaRunner;

impl SaRunner {
    /// Runs SA optimization.
    pub fn run<P: AnnealingProblem>(
        problem: &P,
        config: &AnnealingConfig,
    ) -> Result<SaResult<P::Solution>, AnnealingError> {
        Self::run_with_cancel(problem, config, None)
    }

    /// Runs SA with an optional cancellation token, checked before every
    /// step.
    pub fn run_with_cancel<P: AnnealingProblem>(
        problem: &P,
        config: &AnnealingConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<SaResult<P::Solution>, AnnealingError> {
        let mut simulation = AnnealingSimulation::new(problem, config.clone())?;
        let ctx = ExecutionContext::detached();
        simulation.initialize(&ctx)?;

        // Best energy history: sample every N steps
        let history_interval = 100.max(config.iterations_per_temperature);
        let mut energy_history = Vec::new();
        let mut best_energy = current_best(&simulation)?;
        energy_history.push(best_energy);
        let mut sampled_at = 0;
        let mut cancelled = false;

        loop {
            if let Some(ref flag) = cancel {
                if flag.load(Ordering::Relaxed) {
                    cancelled = true;
                    break;
                }
            }

            let more = simulation.advance(&ctx)?;
            let state = simulation.state().ok_or(AnnealingError::NotInitialized)?;
            best_energy = state.best_energy;
            if state.steps > sampled_at && state.steps % history_interval == 0 {
                energy_history.push(best_energy);
                sampled_at = state.steps;
            }
            if !more {
                break;
            }
        }

        // Final history entry
        if energy_history
            .last()
            .is_none_or(|&last| (last - best_energy).abs() > 1e-15)
        {
            energy_history.push(best_energy);
        }

        let state = simulation
            .into_state()
            .ok_or(AnnealingError::NotInitialized)?;
        debug!(
            steps = state.steps,
            best_energy = state.best_energy,
            cancelled,
            "annealing run finished"
        );

        Ok(SaResult {
            best: state.best,
            best_energy: state.best_energy,
            steps: state.steps,
            final_temperature: state.temperature,
            initial_temperature: state.initial_temperature,
            accepted_moves: state.accepted_moves,
            uphill_moves: state.uphill_moves,
            improving_moves: state.improving_moves,
            cancelled,
            energy_history,
        })
    }
}

fn current_best<P: AnnealingProblem>(
    simulation: &AnnealingSimulation<P>,
) -> Result<f64, AnnealingError> {
    simulation
        .state()
        .map(|state| state.best_energy)
        .ok_or(AnnealingError::NotInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sa::{CoolingSchedule, TemperatureHeuristic};
    use rand::seq::SliceRandom;
    use rand::Rng;

    // ---- Quadratic minimization: f(x) = x^2, minimum at 0 ----

    struct QuadraticProblem;

    impl AnnealingProblem for QuadraticProblem {
        type Solution = f64;
        type Move = f64;

        fn random_solution<R: Rng>(&self, rng: &mut R) -> f64 {
            rng.random_range(-10.0..10.0)
        }

        fn energy(&self, x: &f64) -> f64 {
            x * x
        }

        fn random_move<R: Rng>(&self, rng: &mut R, _x: &f64) -> f64 {
            rng.random_range(-1.0..1.0)
        }

        fn apply_move(&self, x: &mut f64, offset: &f64) {
            *x += offset;
        }
    }

    #[test]
    fn test_sa_quadratic_geometric() {
        let problem = QuadraticProblem;
        let config = AnnealingConfig::default()
            .with_initial_temperature(100.0)
            .with_min_temperature(0.001)
            .with_cooling(CoolingSchedule::Geometric { alpha: 0.95 })
            .with_iterations_per_temperature(50)
            .with_seed(42);

        let result = SaRunner::run(&problem, &config).unwrap();

        assert!(
            result.best_energy < 1.0,
            "expected near-zero energy, got {}",
            result.best_energy
        );
        assert!(result.improving_moves > 0);
        assert!(result.accepted_moves > result.improving_moves);
        assert!(result.uphill_moves > 0);
        assert!(result.final_temperature <= 0.001);
        assert!(!result.cancelled);
    }

    #[test]
    fn test_sa_quadratic_linear() {
        let problem = QuadraticProblem;
        let config = AnnealingConfig::default()
            .with_initial_temperature(100.0)
            .with_min_temperature(0.001)
            .with_cooling(CoolingSchedule::Linear)
            .with_iterations_per_temperature(50)
            .with_max_steps(50000)
            .with_seed(42);

        let result = SaRunner::run(&problem, &config).unwrap();

        assert!(
            result.best_energy < 1.0,
            "expected near-zero energy, got {}",
            result.best_energy
        );
        assert!(result.steps <= 50000);
    }

    #[test]
    fn test_sa_quadratic_lundy_mees() {
        let t0 = 100.0;
        let t_min = 0.001;
        let max_steps = 50000;
        let beta = (t0 - t_min) / (max_steps as f64 * t0 * t_min);

        let problem = QuadraticProblem;
        let config = AnnealingConfig::default()
            .with_initial_temperature(t0)
            .with_min_temperature(t_min)
            .with_cooling(CoolingSchedule::LundyMees { beta })
            .with_iterations_per_temperature(1)
            .with_max_steps(max_steps)
            .with_seed(42);

        let result = SaRunner::run(&problem, &config).unwrap();

        assert!(
            result.best_energy < 1.0,
            "expected near-zero energy, got {}",
            result.best_energy
        );
    }

    #[test]
    fn test_sa_heuristic_initial_temperature() {
        let config = AnnealingConfig::default()
            .with_heuristic(TemperatureHeuristic::default().with_samples(200))
            .with_min_temperature(0.001)
            .with_iterations_per_temperature(50)
            .with_seed(42);

        let result = SaRunner::run(&QuadraticProblem, &config).unwrap();

        assert!(result.initial_temperature > 0.001);
        assert!(result.best_energy < 1.0, "got {}", result.best_energy);
    }

    #[test]
    fn test_sa_max_steps_limit() {
        let problem = QuadraticProblem;
        let config = AnnealingConfig::default()
            .with_initial_temperature(1e10)
            .with_min_temperature(1e-15)
            .with_iterations_per_temperature(10)
            .with_max_steps(100)
            .with_seed(42);

        let result = SaRunner::run(&problem, &config).unwrap();

        assert_eq!(result.steps, 100);
    }

    #[test]
    fn test_sa_history_follows_solver_steps() {
        let config = AnnealingConfig::default()
            .with_initial_temperature(1e10)
            .with_min_temperature(1e-15)
            .with_iterations_per_temperature(1)
            .with_max_steps(1000)
            .with_seed(3);

        let result = SaRunner::run(&QuadraticProblem, &config).unwrap();

        // Start plus one entry per 100 solver steps; the last sample already
        // holds the final best.
        assert_eq!(result.steps, 1000);
        assert_eq!(result.energy_history.len(), 11);
        assert_eq!(result.energy_history.last(), Some(&result.best_energy));
    }

    #[test]
    fn test_sa_cancellation() {
        let problem = QuadraticProblem;
        let config = AnnealingConfig::default()
            .with_initial_temperature(1e10)
            .with_min_temperature(1e-15)
            .with_iterations_per_temperature(100)
            .with_seed(42);

        // Set before running so cancellation does not race the solver.
        let cancel = Arc::new(AtomicBool::new(true));

        let result = SaRunner::run_with_cancel(&problem, &config, Some(cancel)).unwrap();
        assert!(result.cancelled);
        assert_eq!(result.steps, 0);
    }

    #[test]
    fn test_sa_invalid_config() {
        let config = AnnealingConfig::default().with_initial_temperature(f64::NAN);
        let err = SaRunner::run(&QuadraticProblem, &config).unwrap_err();
        assert!(matches!(err, AnnealingError::Config(_)));
    }

    #[test]
    fn test_sa_energy_history_non_increasing() {
        let problem = QuadraticProblem;
        let config = AnnealingConfig::default()
            .with_initial_temperature(50.0)
            .with_min_temperature(0.01)
            .with_cooling(CoolingSchedule::Geometric { alpha: 0.95 })
            .with_iterations_per_temperature(100)
            .with_seed(42);

        let result = SaRunner::run(&problem, &config).unwrap();

        assert!(result.energy_history.len() > 2);
        for window in result.energy_history.windows(2) {
            assert!(
                window[1] <= window[0] + 1e-10,
                "best energy history should be non-increasing: {} > {}",
                window[1],
                window[0]
            );
        }
    }

    // ---- Discrete: permutation sorting ----

    struct PermSortProblem {
        n: usize,
    }

    impl AnnealingProblem for PermSortProblem {
        type Solution = Vec<usize>;
        type Move = (usize, usize);

        fn random_solution<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
            let mut perm: Vec<usize> = (0..self.n).collect();
            perm.shuffle(rng);
            perm
        }

        fn energy(&self, perm: &Vec<usize>) -> f64 {
            // Number of elements not in their correct position
            perm.iter().enumerate().filter(|&(i, &v)| i != v).count() as f64
        }

        fn random_move<R: Rng>(&self, rng: &mut R, _perm: &Vec<usize>) -> (usize, usize) {
            (rng.random_range(0..self.n), rng.random_range(0..self.n))
        }

        fn apply_move(&self, perm: &mut Vec<usize>, &(i, j): &(usize, usize)) {
            perm.swap(i, j);
        }
    }

    #[test]
    fn test_sa_permutation_sort() {
        let problem = PermSortProblem { n: 10 };
        let config = AnnealingConfig::default()
            .with_initial_temperature(50.0)
            .with_min_temperature(0.01)
            .with_cooling(CoolingSchedule::Geometric { alpha: 0.98 })
            .with_iterations_per_temperature(200)
            .with_seed(42);

        let result = SaRunner::run(&problem, &config).unwrap();

        assert!(
            result.best_energy <= 4.0,
            "expected near-sorted permutation, got energy {}",
            result.best_energy
        );
    }

    #[test]
    fn test_sa_metropolis_accepts_uphill() {
        // At very high temperature, almost all moves should be accepted
        let problem = QuadraticProblem;
        let config = AnnealingConfig::default()
            .with_initial_temperature(1e8)
            .with_min_temperature(1e7) // stay at very high temp
            .with_cooling(CoolingSchedule::Geometric { alpha: 0.99 })
            .with_iterations_per_temperature(1000)
            .with_seed(42);

        let result = SaRunner::run(&problem, &config).unwrap();

        let acceptance_ratio = result.accepted_moves as f64 / result.steps as f64;
        assert!(
            acceptance_ratio > 0.8,
            "expected high acceptance at high temp, got {acceptance_ratio}"
        );
    }

    #[test]
    fn test_sa_seeded_runs_match() {
        let config = AnnealingConfig::default()
            .with_initial_temperature(10.0)
            .with_min_temperature(0.01)
            .with_seed(9);
        let a = SaRunner::run(&QuadraticProblem, &config).unwrap();
        let b = SaRunner::run(&QuadraticProblem, &config).unwrap();
        assert_eq!(a.best, b.best);
        assert_eq!(a.steps, b.steps);
        assert_eq!(a.energy_history, b.energy_history);
    }
}
