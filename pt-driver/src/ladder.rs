use std::sync::Arc;

use pt_admin::{AcceptanceRecorder, Config};
use pt_swap::SwapGraph;
use pt_tempering::{NonReversiblePT, Path, State, Tempering, VariationalPT};

/// Either shape of tempering `run` can build from a `Config`: a plain
/// ladder, or a two-leg ladder once `config.is_variational()`. Implements
/// `Tempering` by delegating to whichever leg is active, so the rest of
/// the driver never has to match on it.
pub enum Ladder {
    Fixed(NonReversiblePT),
    Variational(VariationalPT),
}

impl Ladder {
    /// Builds the initial ladder `config` describes. `variational_path` is
    /// required exactly when `config.is_variational()`; callers that mix
    /// up the two will not get this far -- `run` checks first.
    pub fn initial(config: &Config, path: Arc<dyn Path>, variational_path: Option<Arc<dyn Path>>) -> Self {
        match variational_path {
            None => Ladder::Fixed(NonReversiblePT::initial(path, config.n_chains)),
            Some(variational_path) => {
                let fixed = NonReversiblePT::initial(path, config.n_chains);
                let variational = NonReversiblePT::initial(variational_path, config.n_chains_variational);
                Ladder::Variational(VariationalPT::new(fixed, variational))
            }
        }
    }

    pub fn adapt(&self, merged: &AcceptanceRecorder) -> Self {
        match self {
            Ladder::Fixed(t) => Ladder::Fixed(t.adapt(&merged.adjacent_acceptance_rates(t.n_chains()))),
            Ladder::Variational(t) => {
                Ladder::Variational(t.adapt(|c1, c2| merged.acceptance_rate(c1, c2)))
            }
        }
    }

    pub fn global_barrier(&self) -> f64 {
        match self {
            Ladder::Fixed(t) => t.global_barrier(),
            Ladder::Variational(t) => t.global_barrier_variational(),
        }
    }
}

impl Tempering for Ladder {
    fn n_chains(&self) -> u32 {
        match self {
            Ladder::Fixed(t) => t.n_chains(),
            Ladder::Variational(t) => t.n_chains(),
        }
    }

    fn swap_graph(&self) -> &SwapGraph {
        match self {
            Ladder::Fixed(t) => t.swap_graph(),
            Ladder::Variational(t) => t.swap_graph(),
        }
    }

    fn log_potential(&self, chain: u32, state: &State) -> f64 {
        match self {
            Ladder::Fixed(t) => t.log_potential(chain, state),
            Ladder::Variational(t) => t.log_potential(chain, state),
        }
    }
}
