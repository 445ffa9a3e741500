use pt_base::Recorder;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::swap_stat::SwapStat;

/// The per-pair contract a swap round drives: draw a statistic for one
/// side of a pairing, decide whether the pair swaps, and record the
/// outcome. Implementors never see the network or the other replica's
/// private state directly -- the driver exchanges `SwapStat` values and
/// calls `swap_decision`/`record_swap_stats` with both sides in hand.
pub trait PairSwapper<S, R: Recorder> {
    /// `rng` must be the replica's own private generator so draws stay
    /// reproducible from `(master_seed, chain_id_at_creation)` alone.
    fn swap_stat(&self, chain: u32, state: &S, partner_chain: u32, rng: &mut ChaCha8Rng) -> SwapStat;

    /// Pure and symmetric: both participants must compute the same
    /// boolean from the same `(chain1, stat1, chain2, stat2)`, independent
    /// of which side called it or of argument order.
    fn swap_decision(&self, chain1: u32, stat1: SwapStat, chain2: u32, stat2: SwapStat) -> bool {
        swap_decision(chain1, stat1, chain2, stat2)
    }

    /// Called once per pair, only on the side with the lower chain index,
    /// so that a swap between processes is never double-counted.
    fn record_swap_stats(&self, recorder: &mut R, chain1: u32, stat1: SwapStat, chain2: u32, stat2: SwapStat);
}

/// The deterministic acceptance rule shared by every `PairSwapper`:
/// `accept = uniform < min(1, exp(log_ratio_1 + log_ratio_2))`, tie-broken
/// by the lower chain index's uniform draw so both sides land on the same
/// answer without a second round trip. A `NaN` log-ratio on either side is
/// a [`pt_base::ErrorKind::Other`]-worthy numeric degeneracy, not a
/// protocol error -- it is simply rejected.
pub fn swap_decision(chain1: u32, stat1: SwapStat, chain2: u32, stat2: SwapStat) -> bool {
    if stat1.log_ratio.is_nan() || stat2.log_ratio.is_nan() {
        return false;
    }
    let log_acceptance = stat1.log_ratio + stat2.log_ratio;
    let acceptance = log_acceptance.min(0.0).exp();
    let authoritative_uniform = if chain1 < chain2 { stat1.uniform } else { stat2.uniform };
    authoritative_uniform < acceptance
}

/// The ordinary PT pairing rule: `log_ratio` is the change in total
/// log-potential if this replica's state were reassigned from its current
/// chain to `partner_chain`. `log_potential` is supplied by the tempering
/// layer (`pt-tempering`'s `Tempering::log_potential`) rather than named
/// here, so this crate stays independent of any particular path or
/// annealing schedule.
pub struct DefaultPairSwapper<F> {
    log_potential: F,
}

impl<F> DefaultPairSwapper<F> {
    pub fn new(log_potential: F) -> Self {
        DefaultPairSwapper { log_potential }
    }
}

impl<S, F, R> PairSwapper<S, R> for DefaultPairSwapper<F>
where
    F: Fn(u32, &S) -> f64,
    R: Recorder,
{
    fn swap_stat(&self, chain: u32, state: &S, partner_chain: u32, rng: &mut ChaCha8Rng) -> SwapStat {
        let log_ratio = (self.log_potential)(partner_chain, state) - (self.log_potential)(chain, state);
        SwapStat::new(log_ratio, rng.gen::<f64>())
    }

    fn record_swap_stats(&self, recorder: &mut R, chain1: u32, stat1: SwapStat, chain2: u32, stat2: SwapStat) {
        if chain1 >= chain2 {
            return;
        }
        let accepted = self.swap_decision(chain1, stat1, chain2, stat2);
        recorder.record_swap_acceptance(chain1, chain2, accepted);
        if stat1.log_ratio.is_nan() {
            recorder.record_numeric_degeneracy(chain1);
        }
        if stat2.log_ratio.is_nan() {
            recorder.record_numeric_degeneracy(chain2);
        }
    }
}

/// Constant-acceptance-probability swapper for exercising swap-round
/// mechanics without a real target: `acceptance_probability >= 1.0` always
/// swaps, `<= 0.0` never does, regardless of the uniform draw. Only these
/// two boundary values are guaranteed exact; anything in between is not a
/// faithful probability and exists only so tests can sanity-check
/// intermediate behavior.
pub struct TestPairSwapper {
    pub acceptance_probability: f64,
}

impl TestPairSwapper {
    pub fn new(acceptance_probability: f64) -> Self {
        TestPairSwapper {
            acceptance_probability,
        }
    }

    pub fn always_accept() -> Self {
        TestPairSwapper::new(1.0)
    }

    pub fn always_reject() -> Self {
        TestPairSwapper::new(0.0)
    }
}

impl<S, R: Recorder> PairSwapper<S, R> for TestPairSwapper {
    fn swap_stat(&self, _chain: u32, _state: &S, _partner_chain: u32, rng: &mut ChaCha8Rng) -> SwapStat {
        let log_ratio = if self.acceptance_probability >= 1.0 {
            f64::INFINITY
        } else if self.acceptance_probability <= 0.0 {
            f64::NEG_INFINITY
        } else {
            0.5 * self.acceptance_probability.ln()
        };
        SwapStat::new(log_ratio, rng.gen::<f64>())
    }

    fn record_swap_stats(&self, recorder: &mut R, chain1: u32, stat1: SwapStat, chain2: u32, stat2: SwapStat) {
        if chain1 >= chain2 {
            return;
        }
        let accepted = self.swap_decision(chain1, stat1, chain2, stat2);
        recorder.record_swap_acceptance(chain1, chain2, accepted);
    }
}
