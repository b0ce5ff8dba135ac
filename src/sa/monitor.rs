//! Cross-thread view of a running annealing computation.

use std::sync::Arc;

use parking_lot::RwLock;

/// Annealing state owned by the worker thread.
///
/// Published to other threads only as a deep copy through
/// [`AnnealingMonitor`], so readers never observe a half-applied move.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnealingState<S> {
    /// Current (last accepted) solution.
    pub current: S,
    pub current_energy: f64,

    /// Best solution seen so far.
    pub best: S,
    pub best_energy: f64,

    pub temperature: f64,
    pub initial_temperature: f64,

    /// Steps (neighbor evaluations) performed.
    pub steps: u64,

    /// Accepted moves, including neutral and improving ones.
    pub accepted_moves: u64,

    /// Accepted moves that increased the energy.
    pub uphill_moves: u64,

    /// Accepted moves that decreased the energy.
    pub improving_moves: u64,
}

struct Published<S> {
    state: RwLock<Option<AnnealingState<S>>>,
    best_history: RwLock<Vec<(u64, f64)>>,
}

/// Cloneable handle onto the latest published annealing state.
///
/// Obtain it from [`AnnealingSimulation::monitor`](super::AnnealingSimulation::monitor)
/// before handing the simulation to an engine. The state is republished on
/// every best-solution improvement, on every report tick and at shutdown.
pub struct AnnealingMonitor<S> {
    inner: Arc<Published<S>>,
}

impl<S> Clone for AnnealingMonitor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> Default for AnnealingMonitor<S> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Published {
                state: RwLock::new(None),
                best_history: RwLock::new(Vec::new()),
            }),
        }
    }
}

impl<S: Clone> AnnealingMonitor<S> {
    /// Deep copy of the latest published state. `None` before init.
    pub fn snapshot(&self) -> Option<AnnealingState<S>> {
        self.inner.state.read().clone()
    }

    /// Deep copy of the best solution and its energy.
    pub fn best(&self) -> Option<(S, f64)> {
        self.inner
            .state
            .read()
            .as_ref()
            .map(|s| (s.best.clone(), s.best_energy))
    }

    pub fn best_energy(&self) -> Option<f64> {
        self.inner.state.read().as_ref().map(|s| s.best_energy)
    }

    /// `(step, energy)` at each improvement of the best energy.
    pub fn best_history(&self) -> Vec<(u64, f64)> {
        self.inner.best_history.read().clone()
    }

    pub(crate) fn publish(&self, state: &AnnealingState<S>) {
        let copy = state.clone();
        *self.inner.state.write() = Some(copy);
    }

    pub(crate) fn record_best(&self, step: u64, energy: f64) {
        self.inner.best_history.write().push((step, energy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(best_energy: f64) -> AnnealingState<Vec<u32>> {
        AnnealingState {
            current: vec![1, 2, 3],
            current_energy: 3.0,
            best: vec![3, 2, 1],
            best_energy,
            temperature: 1.0,
            initial_temperature: 1.0,
            steps: 0,
            accepted_moves: 0,
            uphill_moves: 0,
            improving_moves: 0,
        }
    }

    #[test]
    fn test_empty_before_publish() {
        let monitor: AnnealingMonitor<Vec<u32>> = AnnealingMonitor::default();
        assert!(monitor.snapshot().is_none());
        assert!(monitor.best().is_none());
        assert!(monitor.best_history().is_empty());
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let monitor = AnnealingMonitor::default();
        let mut original = state(2.0);
        monitor.publish(&original);

        original.best.push(99);
        let (best, energy) = monitor.best().unwrap();
        assert_eq!(best, vec![3, 2, 1]);
        assert_eq!(energy, 2.0);
    }

    #[test]
    fn test_clones_share_publication() {
        let monitor = AnnealingMonitor::default();
        let reader = monitor.clone();
        monitor.publish(&state(5.0));
        monitor.record_best(0, 5.0);
        assert_eq!(reader.best_energy(), Some(5.0));
        assert_eq!(reader.best_history(), vec![(0, 5.0)]);
    }
}
