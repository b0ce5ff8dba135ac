//! Simulated Annealing as an engine-hosted computation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::config::AnnealingConfig;
use super::monitor::{AnnealingMonitor, AnnealingState};
use super::schedule::AnnealingSchedule;
use super::types::{metropolis_probability, AnnealingProblem};
use crate::engine::{ExecutionContext, ProgressInfo, Simulation};
use crate::error::{AnnealingError, BoxError};

/// Lowest estimated `T0`, as a multiple of `min_temperature`.
const ESTIMATE_HEADROOM: f64 = 100.0;

/// Drives an [`AnnealingProblem`] one Metropolis step at a time.
///
/// - `init` draws a random starting solution, fixes `T0` (configured, or
///   estimated by the [`TemperatureHeuristic`](super::TemperatureHeuristic))
///   and seeds the best-solution snapshot.
/// - Each `step` draws one move, applies it to a copy of the current
///   solution and accepts it by the Metropolis rule. The best solution is
///   tracked independently of the current chain, so the chain may wander
///   uphill without losing it. The temperature advances through the
///   schedule every `iterations_per_temperature` steps.
/// - `step` returns `false` once the schedule reports the temperature
///   frozen or the step budget is spent.
/// - Every `report_interval` steps, a progress tick is posted and a refresh
///   requested so listeners can draw the current best solution from the
///   [`AnnealingMonitor`].
///
/// With a fixed seed, a run is fully reproducible.
///
/// # Examples
///
/// ```ignore
/// let sim = AnnealingSimulation::new(problem, AnnealingConfig::default().with_seed(42))?;
/// let monitor = sim.monitor();
/// let engine = Engine::new(sim, EngineConfig::default().with_auto_run(true))?;
/// engine.start();
/// engine.join()?;
/// let (tour, length) = monitor.best().unwrap();
/// ```
pub struct AnnealingSimulation<P: AnnealingProblem> {
    problem: P,
    config: AnnealingConfig,
    schedule: Box<dyn AnnealingSchedule>,
    rng: StdRng,
    state: Option<AnnealingState<P::Solution>>,
    best_history: Vec<(u64, f64)>,
    monitor: AnnealingMonitor<P::Solution>,
}

impl<P: AnnealingProblem> AnnealingSimulation<P> {
    /// Validates `config` and seeds the random source.
    pub fn new(problem: P, config: AnnealingConfig) -> Result<Self, AnnealingError> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed.unwrap_or_else(rand::random));
        Ok(Self {
            schedule: config.cooling.build(config.min_temperature),
            problem,
            config,
            rng,
            state: None,
            best_history: Vec::new(),
            monitor: AnnealingMonitor::default(),
        })
    }

    /// Replaces the configured cooling with a custom schedule.
    pub fn with_schedule(mut self, schedule: impl AnnealingSchedule + 'static) -> Self {
        self.schedule = Box::new(schedule);
        self
    }

    /// Handle for reading the state from other threads.
    pub fn monitor(&self) -> AnnealingMonitor<P::Solution> {
        self.monitor.clone()
    }

    /// Live state. `None` before init.
    pub fn state(&self) -> Option<&AnnealingState<P::Solution>> {
        self.state.as_ref()
    }

    /// Consumes the simulation, returning its final state.
    pub fn into_state(self) -> Option<AnnealingState<P::Solution>> {
        self.state
    }

    /// `(step, energy)` at each improvement of the best energy.
    pub fn best_history(&self) -> &[(u64, f64)] {
        &self.best_history
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    /// `true` once `step` would report completion.
    pub fn is_finished(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|state| finished(&self.config, self.schedule.as_ref(), state))
    }

    /// Sets up the run. A second call is a no-op.
    pub fn initialize(&mut self, ctx: &ExecutionContext) -> Result<(), AnnealingError> {
        if self.state.is_some() {
            return Ok(());
        }

        let current = self.problem.random_solution(&mut self.rng);
        let energy = finite(self.problem.energy(&current))?;
        let initial_temperature = match self.config.initial_temperature {
            Some(t0) => t0,
            None => {
                let estimate = self
                    .config
                    .heuristic
                    .estimate(&self.problem, &current, &mut self.rng)?;
                let floor = self.config.min_temperature * ESTIMATE_HEADROOM;
                if estimate < floor {
                    debug!(estimate, floor, "estimated temperature raised above the freezing point");
                }
                estimate.max(floor)
            }
        };
        self.schedule
            .calibrate(initial_temperature, self.config.levels());
        if self.schedule.is_frozen(initial_temperature) {
            warn!(
                initial_temperature,
                min_temperature = self.config.min_temperature,
                "initial temperature is already frozen"
            );
        }
        debug!(initial_temperature, energy, "annealing initialized");

        let state = AnnealingState {
            best: current.clone(),
            best_energy: energy,
            current,
            current_energy: energy,
            temperature: initial_temperature,
            initial_temperature,
            steps: 0,
            accepted_moves: 0,
            uphill_moves: 0,
            improving_moves: 0,
        };
        self.best_history.push((0, energy));
        self.monitor.record_best(0, energy);
        self.monitor.publish(&state);
        self.state = Some(state);

        ctx.post_message(format!(
            "initial temperature {initial_temperature:.6}, energy {energy:.6}"
        ));
        Ok(())
    }

    /// Performs one Metropolis step. Returns `Ok(false)` once finished.
    pub fn advance(&mut self, ctx: &ExecutionContext) -> Result<bool, AnnealingError> {
        let state = self.state.as_mut().ok_or(AnnealingError::NotInitialized)?;
        if finished(&self.config, self.schedule.as_ref(), state) {
            return Ok(false);
        }

        let mv = self.problem.random_move(&mut self.rng, &state.current);
        let mut candidate = state.current.clone();
        self.problem.apply_move(&mut candidate, &mv);
        let candidate_energy = finite(self.problem.energy(&candidate))?;
        let delta = candidate_energy - state.current_energy;

        // Metropolis acceptance criterion; the uniform draw happens only for
        // uphill moves.
        let accept = delta <= 0.0
            || self.rng.random::<f64>() < metropolis_probability(delta, state.temperature);

        state.steps += 1;
        if accept {
            state.current = candidate;
            state.current_energy = candidate_energy;
            state.accepted_moves += 1;
            if delta > 0.0 {
                state.uphill_moves += 1;
            } else if delta < 0.0 {
                state.improving_moves += 1;
            }

            if candidate_energy < state.best_energy {
                state.best = state.current.clone();
                state.best_energy = candidate_energy;
                self.best_history.push((state.steps, candidate_energy));
                self.monitor.record_best(state.steps, candidate_energy);
                self.monitor.publish(state);
            }
        }

        if state.steps % self.config.iterations_per_temperature == 0 {
            state.temperature = self.schedule.next_temperature(state.temperature);
        }

        let interval = self.config.report_interval;
        if interval > 0 && state.steps % interval == 0 {
            self.monitor.publish(state);
            ctx.post_progress(progress_of(&self.config, state));
            ctx.request_refresh();
        }

        Ok(!finished(&self.config, self.schedule.as_ref(), state))
    }
}

impl<P: AnnealingProblem> Simulation for AnnealingSimulation<P> {
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        Ok(self.initialize(ctx)?)
    }

    fn step(&mut self, ctx: &ExecutionContext) -> Result<bool, BoxError> {
        Ok(self.advance(ctx)?)
    }

    fn shutdown(&mut self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        if let Some(state) = &self.state {
            self.monitor.publish(state);
            info!(
                steps = state.steps,
                best_energy = state.best_energy,
                temperature = state.temperature,
                accepted = state.accepted_moves,
                uphill = state.uphill_moves,
                "annealing finished"
            );
            ctx.post_message(format!(
                "best energy {:.6} after {} steps",
                state.best_energy, state.steps
            ));
            ctx.request_refresh();
        }
        Ok(())
    }

    fn progress(&self, _ctx: &ExecutionContext) -> ProgressInfo {
        match &self.state {
            Some(state) => progress_of(&self.config, state),
            None => ProgressInfo::indeterminate(),
        }
    }

    fn name(&self) -> &str {
        "simulated-annealing"
    }
}

fn finished<S>(
    config: &AnnealingConfig,
    schedule: &dyn AnnealingSchedule,
    state: &AnnealingState<S>,
) -> bool {
    schedule.is_frozen(state.temperature) || (config.max_steps > 0 && state.steps >= config.max_steps)
}

fn finite(energy: f64) -> Result<f64, AnnealingError> {
    if energy.is_finite() {
        Ok(energy)
    } else {
        Err(AnnealingError::NonFiniteEnergy(energy))
    }
}

/// Completion estimate: the further of step budget and cooling progress
/// (measured on a log scale between `T0` and the minimum temperature).
fn progress_of<S>(config: &AnnealingConfig, state: &AnnealingState<S>) -> ProgressInfo {
    let by_steps = (config.max_steps > 0).then(|| state.steps as f64 / config.max_steps as f64);
    let t0 = state.initial_temperature;
    let by_temperature = (t0 > config.min_temperature && state.temperature > 0.0)
        .then(|| (t0 / state.temperature).ln() / (t0 / config.min_temperature).ln());
    let info = match (by_steps, by_temperature) {
        (Some(a), Some(b)) => ProgressInfo::determinate(a.max(b)),
        (Some(a), None) | (None, Some(a)) => ProgressInfo::determinate(a),
        (None, None) => ProgressInfo::indeterminate(),
    };
    info.with_message(format!(
        "T={:.4e} best={:.6} current={:.6} accepted={} uphill={}",
        state.temperature,
        state.best_energy,
        state.current_energy,
        state.accepted_moves,
        state.uphill_moves
    ))
}
