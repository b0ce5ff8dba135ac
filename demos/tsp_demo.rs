//! Anneals a random travelling-salesman tour inside the engine.
//!
//! Pauses the run halfway through the step budget, resumes it, and prints
//! every lifecycle event plus a line per refresh.
//!
//! ```text
//! RUST_LOG=u_simengine=debug cargo run --example tsp_demo -- 60
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;
use u_simengine::engine::{
    Engine, EngineConfig, LifecycleState, ProgressInfo, ProgressInterval, SimulationListener,
};
use u_simengine::sa::{AnnealingConfig, AnnealingMonitor, AnnealingProblem, AnnealingSimulation};
use u_simengine::SimulationError;

struct Tsp {
    cities: Vec<(f64, f64)>,
}

impl AnnealingProblem for Tsp {
    type Solution = Vec<usize>;
    type Move = (usize, usize);

    fn random_solution<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        let mut tour: Vec<usize> = (0..self.cities.len()).collect();
        tour.shuffle(rng);
        tour
    }

    fn energy(&self, tour: &Vec<usize>) -> f64 {
        (0..tour.len())
            .map(|i| {
                let (ax, ay) = self.cities[tour[i]];
                let (bx, by) = self.cities[tour[(i + 1) % tour.len()]];
                ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
            })
            .sum()
    }

    fn random_move<R: Rng>(&self, rng: &mut R, tour: &Vec<usize>) -> (usize, usize) {
        let i = rng.random_range(0..tour.len() - 1);
        let j = rng.random_range(i + 1..tour.len());
        (i, j)
    }

    fn apply_move(&self, tour: &mut Vec<usize>, &(i, j): &(usize, usize)) {
        tour[i..=j].reverse();
    }
}

struct Console {
    monitor: AnnealingMonitor<Vec<usize>>,
}

impl SimulationListener for Console {
    fn on_state_change(&self, from: LifecycleState, to: LifecycleState, reason: &str) {
        println!("[state] {from} -> {to} ({reason})");
    }

    fn on_fail(&self, error: &SimulationError) {
        eprintln!("[fail] {error}");
    }

    fn on_message(&self, text: &str) {
        println!("[message] {text}");
    }

    fn on_progress(&self, info: &ProgressInfo) {
        let percent = info.fraction.map_or(0.0, |f| f * 100.0);
        println!(
            "[progress] {percent:5.1}% {}",
            info.message.as_deref().unwrap_or("")
        );
    }

    fn on_refresh(&self) {
        if let Some(state) = self.monitor.snapshot() {
            println!(
                "[refresh] step {:>7} best {:>10.3} current {:>10.3}",
                state.steps, state.best_energy, state.current_energy
            );
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let n = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(40usize)
        .max(3);
    let mut rng = StdRng::seed_from_u64(2024);
    let cities = (0..n)
        .map(|_| (rng.random_range(0.0..1000.0), rng.random_range(0.0..1000.0)))
        .collect();

    let max_steps = 400_000;
    let config = AnnealingConfig::default()
        .with_iterations_per_temperature(200)
        .with_max_steps(max_steps)
        .with_report_interval(20_000)
        .with_seed(7);
    let simulation = match AnnealingSimulation::new(Tsp { cities }, config) {
        Ok(simulation) => simulation,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            return;
        }
    };
    let monitor = simulation.monitor();

    let engine_config = EngineConfig::default()
        .with_name("tsp")
        .with_progress_interval(ProgressInterval::Steps(50_000))
        .with_refresh_interval(Duration::from_millis(100));
    let engine = match Engine::new(simulation, engine_config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("cannot create engine: {err}");
            return;
        }
    };
    engine.add_listener(Arc::new(Console {
        monitor: monitor.clone(),
    }));

    engine.start();
    engine.run();

    while !engine.is_finished() && engine.context().steps < max_steps / 2 {
        thread::sleep(Duration::from_millis(5));
    }
    engine.pause();
    thread::sleep(Duration::from_millis(200));
    println!("[host] paused at step {}", engine.context().steps);
    engine.resume();

    if let Err(err) = engine.join() {
        eprintln!("join failed: {err}");
        return;
    }

    let context = engine.context();
    match monitor.best() {
        Some((tour, length)) => println!(
            "best tour {length:.3} after {} steps in {:?}: {tour:?}",
            context.steps, context.elapsed
        ),
        None => println!("no solution ({})", engine.state()),
    }
}
