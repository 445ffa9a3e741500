use pt_base::{err, ErrorKind, Result};

/// A fixed, pure `chain -> partner_chain` involution for a given round.
/// Never touches replica state or the network; [`crate::pair_swapper`] and
/// the driver crate resolve which physical replica currently holds each
/// side via `pt-store`'s `chain_to_replica_global_indices`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapGraph {
    /// Deterministic even-odd: chain `i` pairs with `i+1` on rounds where
    /// `i` and the round share parity, with `i-1` otherwise; chains at the
    /// ends of the ladder that have no such neighbor self-pair (no-op).
    Deo { n: u32 },
    /// Two legs concatenated as `[fixed (1..=n_fixed); variational,
    /// reversed]`, each running its own DEO, with the two target-adjacent
    /// boundary chains (`n_fixed` and `n_fixed+1`) folded into each other
    /// on whichever parity of round would otherwise leave both idle.
    VariationalDeo { n_fixed: u32, n_variational: u32 },
}

impl SwapGraph {
    pub fn deo(n: u32) -> Self {
        assert!(n >= 1, "a swap graph needs at least one chain");
        SwapGraph::Deo { n }
    }

    pub fn variational_deo(n_fixed: u32, n_variational: u32) -> Self {
        assert!(
            n_fixed >= 2 && n_variational >= 2,
            "each leg of a variational swap graph needs at least two chains"
        );
        SwapGraph::VariationalDeo {
            n_fixed,
            n_variational,
        }
    }

    pub fn n_chains(&self) -> u32 {
        match self {
            SwapGraph::Deo { n } => *n,
            SwapGraph::VariationalDeo {
                n_fixed,
                n_variational,
            } => n_fixed + n_variational,
        }
    }

    /// The chain `chain` is paired with in `round`. Verifies the result is
    /// genuinely an involution, i.e. `partner_chain(partner) == chain`;
    /// fails with [`ErrorKind::InvolutionViolation`] rather than panicking
    /// so a malformed graph is catchable in release builds too.
    pub fn partner_chain(&self, round: u64, chain: u32) -> Result<u32> {
        let partner = self.resolve(round, chain);
        if self.resolve(round, partner) != chain {
            return Err(err(
                ErrorKind::InvolutionViolation,
                format!("swap graph is not an involution at round {round}, chain {chain}"),
            ));
        }
        Ok(partner)
    }

    fn resolve(&self, round: u64, chain: u32) -> u32 {
        match self {
            SwapGraph::Deo { n } => deo_partner(*n, round, chain),
            SwapGraph::VariationalDeo {
                n_fixed,
                n_variational,
            } => variational_partner(*n_fixed, *n_variational, round, chain),
        }
    }
}

/// `None` only at the two ends of a `len`-long leg: `i == len` when `i`
/// shares parity with `parity_bit`, or `i == 1` when it doesn't.
fn leg_local_partner(len: u32, parity_bit: u64, i: u32) -> Option<u32> {
    let same_parity = (i % 2) as u64 == parity_bit;
    if same_parity {
        if i + 1 <= len {
            Some(i + 1)
        } else {
            None
        }
    } else if i >= 2 {
        Some(i - 1)
    } else {
        None
    }
}

fn deo_partner(n: u32, round: u64, chain: u32) -> u32 {
    leg_local_partner(n, round % 2, chain).unwrap_or(chain)
}

/// Global chain `n_fixed` and `n_fixed+1` are the two target-adjacent
/// boundary positions of the two legs. `var_parity` is chosen so that the
/// variational leg's own boundary goes idle in `leg_local_partner` on
/// exactly the same rounds as the fixed leg's does, regardless of the
/// individual parities of `n_fixed` and `n_variational` -- which is what
/// lets the fold below simply take over both idle boundaries instead of
/// stealing a partner out from under an ordinary interior pairing.
fn variational_partner(n_fixed: u32, n_variational: u32, round: u64, chain: u32) -> u32 {
    let r = round % 2;
    let var_parity = r ^ (n_fixed % 2) as u64 ^ (n_variational % 2) as u64;
    let total = n_fixed + n_variational;

    if chain <= n_fixed {
        match leg_local_partner(n_fixed, r, chain) {
            Some(p) => p,
            None if chain == n_fixed => n_fixed + 1,
            None => chain,
        }
    } else {
        let lv = total - chain + 1;
        match leg_local_partner(n_variational, var_parity, lv) {
            Some(p_lv) => total - p_lv + 1,
            None if lv == n_variational => n_fixed,
            None => chain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn assert_involution(graph: &SwapGraph, round: u64) {
        for chain in 1..=graph.n_chains() {
            let partner = graph.partner_chain(round, chain).unwrap();
            assert_eq!(graph.partner_chain(round, partner).unwrap(), chain);
        }
    }

    #[test]
    fn test_linear_deo_round_one_and_two() {
        let graph = SwapGraph::deo(4);
        let round1: Vec<u32> = (1..=4).map(|c| graph.partner_chain(1, c).unwrap()).collect();
        assert_eq!(round1, vec![2, 1, 4, 3]);
        let round2: Vec<u32> = (1..=4).map(|c| graph.partner_chain(2, c).unwrap()).collect();
        assert_eq!(round2, vec![1, 3, 2, 4]);
        assert_involution(&graph, 1);
        assert_involution(&graph, 2);
    }

    #[test]
    fn test_linear_deo_chain_to_replica_mapping_after_two_rounds() {
        // chain_to_replica_global_indices composes as T_r = T_{r-1} . g_r,
        // i.e. T_r(i) = T_{r-1}(g_r(i)); starting from the identity this
        // gives T_2(i) = g_1(g_2(i)).
        let graph = SwapGraph::deo(4);
        let g1 = |c: u32| graph.partner_chain(1, c).unwrap();
        let g2 = |c: u32| graph.partner_chain(2, c).unwrap();
        let t2: Vec<u32> = (1..=4).map(|i| g1(g2(i))).collect();
        assert_eq!(t2, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_variational_deo_is_involution_across_many_rounds() {
        let graph = SwapGraph::variational_deo(5, 5);
        for round in 0..12 {
            assert_involution(&graph, round);
        }
    }

    #[test]
    fn test_variational_deo_folds_on_some_round() {
        let graph = SwapGraph::variational_deo(5, 5);
        let folded = (0..4).any(|round| graph.partner_chain(round, 5).unwrap() == 6);
        assert!(folded, "expected at least one round to fold chains 5 and 6 together");
    }

    #[test]
    fn test_variational_deo_asymmetric_leg_lengths_stay_involutions() {
        let graph = SwapGraph::variational_deo(3, 6);
        for round in 0..10 {
            assert_involution(&graph, round);
        }
    }
}
