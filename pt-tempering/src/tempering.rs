use std::sync::Arc;

use pt_swap::{DefaultPairSwapper, SwapGraph};

use crate::indexer::{Indexer, Leg};
use crate::path::{LogPotential, Path, State};
use crate::schedule::{adapt_schedule, equally_spaced_schedule};

/// Resolves a chain's log-potential and exposes the swap graph it runs
/// against. Implemented by both a plain ladder (`NonReversiblePT`) and a
/// two-leg variational ladder (`VariationalPT`).
pub trait Tempering {
    fn n_chains(&self) -> u32;
    fn swap_graph(&self) -> &SwapGraph;
    fn log_potential(&self, chain: u32, state: &State) -> f64;
}

/// A single annealing ladder: a path, a schedule of `beta` values (one per
/// chain), the log-potentials derived from them, the per-pair local
/// barrier estimates from the most recent round's acceptance rates (empty
/// before the first adaptation), and the swap graph driving it.
pub struct NonReversiblePT {
    pub path: Arc<dyn Path>,
    pub schedule: Vec<f64>,
    pub log_potentials: Vec<LogPotential>,
    pub local_barriers: Vec<f64>,
    pub swap_graph: SwapGraph,
}

impl NonReversiblePT {
    pub fn new(path: Arc<dyn Path>, schedule: Vec<f64>) -> Self {
        let swap_graph = SwapGraph::deo(schedule.len() as u32);
        let log_potentials = schedule.iter().map(|&beta| path.interpolate(beta)).collect();
        NonReversiblePT {
            path,
            schedule,
            log_potentials,
            local_barriers: Vec::new(),
            swap_graph,
        }
    }

    pub fn initial(path: Arc<dyn Path>, n_chains: u32) -> Self {
        NonReversiblePT::new(path, equally_spaced_schedule(n_chains))
    }

    /// Produces the next round's tempering: the schedule is redistributed
    /// by `acceptance_rates` (one per adjacent pair, `len() == n-1`) using
    /// the equal-local-barrier rule, and fresh log-potentials are derived
    /// along the same path.
    pub fn adapt(&self, acceptance_rates: &[f64]) -> Self {
        let schedule = adapt_schedule(&self.schedule, acceptance_rates);
        let log_potentials = schedule
            .iter()
            .map(|&beta| self.path.interpolate(beta))
            .collect();
        NonReversiblePT {
            path: self.path.clone(),
            schedule,
            log_potentials,
            local_barriers: acceptance_rates.iter().map(|&a| (1.0 - a).clamp(0.0, 1.0)).collect(),
            swap_graph: self.swap_graph,
        }
    }

    pub fn global_barrier(&self) -> f64 {
        self.local_barriers.iter().sum()
    }
}

impl Tempering for NonReversiblePT {
    fn n_chains(&self) -> u32 {
        self.schedule.len() as u32
    }

    fn swap_graph(&self) -> &SwapGraph {
        &self.swap_graph
    }

    fn log_potential(&self, chain: u32, state: &State) -> f64 {
        self.log_potentials[(chain - 1) as usize](state)
    }
}

/// Two `NonReversiblePT` legs -- a fixed one and a learned ("variational")
/// one -- concatenated with the variational leg reversed, plus the
/// folded swap graph spanning both.
pub struct VariationalPT {
    pub fixed: NonReversiblePT,
    pub variational: NonReversiblePT,
    pub indexer: Indexer,
    pub swap_graph: SwapGraph,
}

impl VariationalPT {
    pub fn new(fixed: NonReversiblePT, variational: NonReversiblePT) -> Self {
        let n_fixed = fixed.n_chains();
        let n_variational = variational.n_chains();
        let indexer = Indexer::new(n_fixed, n_variational);
        let swap_graph = SwapGraph::variational_deo(n_fixed, n_variational);
        VariationalPT {
            fixed,
            variational,
            indexer,
            swap_graph,
        }
    }

    pub fn global_barrier_variational(&self) -> f64 {
        self.fixed.global_barrier() + self.variational.global_barrier()
    }

    /// Adapts both legs independently. `acceptance_rate(chain1, chain2)`
    /// answers with the observed rate for a global adjacent pair; the fixed
    /// leg's local pair `(i, i+1)` is the global pair of the same numbers,
    /// while the variational leg is laid out reversed, so its local pair
    /// `(i, i+1)` is global `(g-1, g)` for `g = indexer.global_index(Variational, i)`
    /// -- still adjacent, just queried in the other order, which
    /// `acceptance_rate` doesn't care about. The fold pair joining the two
    /// legs is not part of either leg's own schedule and plays no part in
    /// this adaptation.
    pub fn adapt(&self, acceptance_rate: impl Fn(u32, u32) -> f64) -> Self {
        let n_fixed = self.fixed.n_chains();
        let n_variational = self.variational.n_chains();

        let fixed_rates: Vec<f64> = (1..n_fixed).map(|i| acceptance_rate(i, i + 1)).collect();
        let variational_rates: Vec<f64> = (1..n_variational)
            .map(|i| {
                let g1 = self.indexer.global_index(Leg::Variational, i);
                let g2 = self.indexer.global_index(Leg::Variational, i + 1);
                acceptance_rate(g1, g2)
            })
            .collect();

        VariationalPT::new(self.fixed.adapt(&fixed_rates), self.variational.adapt(&variational_rates))
    }
}

impl Tempering for VariationalPT {
    fn n_chains(&self) -> u32 {
        self.indexer.n_chains()
    }

    fn swap_graph(&self) -> &SwapGraph {
        &self.swap_graph
    }

    fn log_potential(&self, chain: u32, state: &State) -> f64 {
        match self.indexer.leg_and_local(chain) {
            (Leg::Fixed, local) => self.fixed.log_potential(local, state),
            (Leg::Variational, local) => self.variational.log_potential(local, state),
        }
    }
}

/// `[fixed.log_potentials...; variational.log_potentials.reversed()...]`,
/// the concatenated vector a `VariationalPT` exposes as a single ladder.
pub fn concatenate_log_potentials(fixed: &[LogPotential], variational: &[LogPotential]) -> Vec<LogPotential> {
    let mut out: Vec<LogPotential> = fixed.to_vec();
    out.extend(variational.iter().rev().cloned());
    out
}

/// Wraps a tempering's `log_potential` as the closure a
/// [`pt_swap::DefaultPairSwapper`] needs, so the driver never has to know
/// whether it holds a plain or variational ladder.
pub fn create_pair_swapper<T>(tempering: Arc<T>) -> DefaultPairSwapper<impl Fn(u32, &State) -> f64>
where
    T: Tempering + Send + Sync + 'static,
{
    DefaultPairSwapper::new(move |chain: u32, state: &State| tempering.log_potential(chain, state))
}
