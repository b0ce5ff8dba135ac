//! Core trait for Simulated Annealing.

use rand::Rng;

/// Defines a solution space for Simulated Annealing.
///
/// The user implements solution generation, energy evaluation and moves.
/// The SA layer handles temperature management, the acceptance criterion,
/// cooling and best-solution tracking.
///
/// # Minimization
///
/// SA minimizes energy. Energies may be negative; for maximization, negate
/// the objective.
///
/// # Moves
///
/// A move is drawn from the current solution and applied to a working copy.
/// For a deterministic `rng`, the same sequence of draws must produce the
/// same moves, so that seeded runs are reproducible. The neighborhood must be
/// connected: any solution reachable from any other through a sequence of
/// moves.
///
/// # Solutions
///
/// `Clone` must produce an independent deep copy. Copies are kept as the
/// best-so-far snapshot and handed to other threads while the run continues.
///
/// # Examples
///
/// ```ignore
/// struct Tsp { distances: Vec<Vec<f64>> }
///
/// impl AnnealingProblem for Tsp {
///     type Solution = Vec<usize>;
///     type Move = (usize, usize);
///
///     fn random_solution<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
///         let mut tour: Vec<usize> = (0..self.distances.len()).collect();
///         tour.shuffle(rng);
///         tour
///     }
///
///     fn energy(&self, tour: &Vec<usize>) -> f64 {
///         (0..tour.len())
///             .map(|i| self.distances[tour[i]][tour[(i + 1) % tour.len()]])
///             .sum()
///     }
///
///     fn random_move<R: Rng>(&self, rng: &mut R, tour: &Vec<usize>) -> (usize, usize) {
///         (rng.random_range(0..tour.len()), rng.random_range(0..tour.len()))
///     }
///
///     fn apply_move(&self, tour: &mut Vec<usize>, &(i, j): &(usize, usize)) {
///         tour.swap(i, j);
///     }
/// }
/// ```
///
/// # References
///
/// Kirkpatrick et al. (1983), Cerny (1985)
pub trait AnnealingProblem: Send + Sync {
    /// The solution representation type.
    type Solution: Clone + Send + Sync;

    /// A perturbation of a solution.
    type Move: Send + Sync;

    /// Creates a random valid starting solution.
    fn random_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution;

    /// Energy of a solution. Lower is better.
    fn energy(&self, solution: &Self::Solution) -> f64;

    /// Draws a random move from `solution`'s neighborhood.
    fn random_move<R: Rng>(&self, rng: &mut R, solution: &Self::Solution) -> Self::Move;

    /// Applies a move in place.
    fn apply_move(&self, solution: &mut Self::Solution, mv: &Self::Move);
}

impl<P: AnnealingProblem> AnnealingProblem for &P {
    type Solution = P::Solution;
    type Move = P::Move;

    fn random_solution<R: Rng>(&self, rng: &mut R) -> Self::Solution {
        (**self).random_solution(rng)
    }

    fn energy(&self, solution: &Self::Solution) -> f64 {
        (**self).energy(solution)
    }

    fn random_move<R: Rng>(&self, rng: &mut R, solution: &Self::Solution) -> Self::Move {
        (**self).random_move(rng, solution)
    }

    fn apply_move(&self, solution: &mut Self::Solution, mv: &Self::Move) {
        (**self).apply_move(solution, mv)
    }
}

/// Metropolis acceptance probability of a move with energy change `delta`
/// at `temperature`.
///
/// Improving and neutral moves (`delta <= 0`) are always accepted. Worsening
/// moves are accepted with probability `exp(-delta / T)`, which never
/// decreases as `T` grows. At `T <= 0` worsening moves are rejected.
pub fn metropolis_probability(delta: f64, temperature: f64) -> f64 {
    if delta <= 0.0 {
        1.0
    } else if temperature > 0.0 {
        (-delta / temperature).exp()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_downhill_always_accepted() {
        assert_eq!(metropolis_probability(-3.0, 1e-9), 1.0);
        assert_eq!(metropolis_probability(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_uphill_rejected_when_frozen() {
        assert_eq!(metropolis_probability(1.0, 0.0), 0.0);
        assert_eq!(metropolis_probability(1.0, -5.0), 0.0);
    }

    #[test]
    fn test_uphill_probability() {
        let p = metropolis_probability(1.0, 1.0);
        assert!((p - (-1.0f64).exp()).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_monotonic_in_temperature(
            delta in 1e-6f64..1e3,
            low in 1e-6f64..1e3,
            factor in 1.0f64..1e3,
        ) {
            let high = low * factor;
            prop_assert!(metropolis_probability(delta, high) >= metropolis_probability(delta, low));
        }

        #[test]
        fn prop_probability_in_unit_interval(delta in -1e6f64..1e6, t in 0.0f64..1e6) {
            let p = metropolis_probability(delta, t);
            prop_assert!((0.0..=1.0).contains(&p));
        }
    }
}
