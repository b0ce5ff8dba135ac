//! Criterion benchmarks for u-simengine.
//!
//! Uses a synthetic problem (Sphere function) and a no-op computation to
//! measure annealing cost and engine overhead independent of any domain.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_simengine::engine::{Engine, EngineConfig, ExecutionContext, ProgressInterval, Simulation};
use u_simengine::sa::{
    AnnealingConfig, AnnealingProblem, AnnealingSimulation, SaRunner, TemperatureHeuristic,
};
use u_simengine::BoxError;

// ===========================================================================
// Sphere function: minimize sum(x_i^2)
// ===========================================================================

struct SphereSa {
    dim: usize,
}

impl AnnealingProblem for SphereSa {
    type Solution = Vec<f64>;
    type Move = (usize, f64);

    fn random_solution<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        (0..self.dim).map(|_| rng.random_range(-5.0..5.0)).collect()
    }

    fn energy(&self, sol: &Vec<f64>) -> f64 {
        sol.iter().map(|x| x * x).sum()
    }

    fn random_move<R: Rng>(&self, rng: &mut R, _sol: &Vec<f64>) -> (usize, f64) {
        (rng.random_range(0..self.dim), rng.random_range(-0.5..0.5))
    }

    fn apply_move(&self, sol: &mut Vec<f64>, &(i, offset): &(usize, f64)) {
        sol[i] += offset;
    }
}

// ===========================================================================
// No-op computation: isolates lifecycle and event delivery
// ===========================================================================

struct Spin {
    remaining: u64,
}

impl Simulation for Spin {
    fn init(&mut self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
        Ok(())
    }

    fn step(&mut self, _ctx: &ExecutionContext) -> Result<bool, BoxError> {
        self.remaining -= 1;
        Ok(self.remaining > 0)
    }
}

fn sphere_config() -> AnnealingConfig {
    AnnealingConfig::default()
        .with_initial_temperature(100.0)
        .with_min_temperature(0.01)
        .with_max_steps(1000)
        .with_seed(42)
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_sa_sphere(c: &mut Criterion) {
    let mut group = c.benchmark_group("sa_sphere");
    group.sample_size(10);

    for &dim in &[10, 50, 100] {
        let problem = SphereSa { dim };
        let config = sphere_config();
        group.bench_with_input(BenchmarkId::from_parameter(dim), &(problem, config), |b, (p, c)| {
            b.iter(|| {
                let result = SaRunner::run(black_box(p), black_box(c));
                black_box(result)
            })
        });
    }
    group.finish();
}

fn bench_sa_engine_sphere(c: &mut Criterion) {
    let mut group = c.benchmark_group("sa_engine_sphere");
    group.sample_size(10);

    for &dim in &[10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |b, &dim| {
            b.iter(|| {
                let simulation =
                    AnnealingSimulation::new(SphereSa { dim }, sphere_config()).unwrap();
                let engine =
                    Engine::new(simulation, EngineConfig::default().with_auto_run(true)).unwrap();
                engine.start();
                engine.join().unwrap();
                black_box(engine.context())
            })
        });
    }
    group.finish();
}

fn bench_engine_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_overhead");
    group.sample_size(10);

    for (label, interval) in [
        ("no_progress", ProgressInterval::Disabled),
        ("progress_every_step", ProgressInterval::Steps(1)),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| {
                let config = EngineConfig::default()
                    .with_auto_run(true)
                    .with_progress_interval(interval);
                let engine = Engine::new(Spin { remaining: 10_000 }, config).unwrap();
                engine.start();
                engine.join().unwrap();
                black_box(engine.context())
            })
        });
    }
    group.finish();
}

fn bench_initial_temperature(c: &mut Criterion) {
    let mut group = c.benchmark_group("initial_temperature");
    group.sample_size(20);

    let problem = SphereSa { dim: 50 };
    for &samples in &[100usize, 1000] {
        let heuristic = TemperatureHeuristic::default().with_samples(samples);
        group.bench_with_input(BenchmarkId::from_parameter(samples), &heuristic, |b, h| {
            let mut rng = StdRng::seed_from_u64(42);
            let start = problem.random_solution(&mut rng);
            b.iter(|| black_box(h.estimate(&problem, &start, &mut rng)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_sa_sphere,
    bench_sa_engine_sphere,
    bench_engine_overhead,
    bench_initial_temperature
);
criterion_main!(benches);
