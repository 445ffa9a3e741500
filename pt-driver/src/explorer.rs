use pt_tempering::{LogPotential, State};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Mutates `state` in place towards its equilibrium under `log_potential`.
/// Pure side effect on `state`; everything an implementation needs besides
/// that comes in as arguments, so it stays independent of the swap core.
pub trait Explorer {
    fn explore(&self, state: &mut State, log_potential: &LogPotential, rng: &mut ChaCha8Rng);
}

/// A single symmetric random-walk Metropolis step: propose `state + U(-step_size,
/// step_size)` per coordinate, accept with the usual Metropolis ratio. The
/// minimal real exploration kernel, not a tuned one.
pub struct RandomWalkExplorer {
    pub step_size: f64,
}

impl RandomWalkExplorer {
    pub fn new(step_size: f64) -> Self {
        RandomWalkExplorer { step_size }
    }
}

impl Explorer for RandomWalkExplorer {
    fn explore(&self, state: &mut State, log_potential: &LogPotential, rng: &mut ChaCha8Rng) {
        let current_log_density = log_potential(state);
        let proposal: State = state
            .iter()
            .map(|&x| x + self.step_size * (rng.gen::<f64>() * 2.0 - 1.0))
            .collect();
        let proposal_log_density = log_potential(&proposal);
        let log_accept = proposal_log_density - current_log_density;
        if log_accept >= 0.0 || rng.gen::<f64>() < log_accept.exp() {
            *state = proposal;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use rand::SeedableRng;
    use test_log::test;

    #[test]
    fn test_random_walk_explorer_moves_toward_higher_density() {
        let log_potential: LogPotential = Arc::new(|x: &State| -(x[0] - 5.0).powi(2));
        let explorer = RandomWalkExplorer::new(0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut state = vec![0.0];
        for _ in 0..2000 {
            explorer.explore(&mut state, &log_potential, &mut rng);
        }
        assert!((state[0] - 5.0).abs() < 1.0);
    }
}
