/// Which leg of a `VariationalPT` a global chain index belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leg {
    Fixed,
    Variational,
}

/// Bijection between a global chain index `1..=n_fixed+n_variational` and
/// `(leg, local_chain)`, where `local_chain` is the chain number inside
/// that leg's own `NonReversiblePT` (so `1` is always that leg's reference
/// and `local_chain == n` is always its target). The variational leg is
/// stored reversed in the global layout (`ref-target-target-ref`), which
/// is what the `N_v - (i - N_f) + 1` term inverts.
#[derive(Clone, Copy, Debug)]
pub struct Indexer {
    n_fixed: u32,
    n_variational: u32,
}

impl Indexer {
    pub fn new(n_fixed: u32, n_variational: u32) -> Self {
        Indexer {
            n_fixed,
            n_variational,
        }
    }

    pub fn n_chains(&self) -> u32 {
        self.n_fixed + self.n_variational
    }

    pub fn leg_and_local(&self, global: u32) -> (Leg, u32) {
        if global <= self.n_fixed {
            (Leg::Fixed, global)
        } else {
            (Leg::Variational, self.n_variational - (global - self.n_fixed) + 1)
        }
    }

    pub fn global_index(&self, leg: Leg, local: u32) -> u32 {
        match leg {
            Leg::Fixed => local,
            Leg::Variational => self.n_fixed + (self.n_variational - local + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_indexer_maps_global_index_to_leg_and_local_chain() {
        let indexer = Indexer::new(5, 5);
        assert_eq!(indexer.leg_and_local(6), (Leg::Variational, 5));
        assert_eq!(indexer.leg_and_local(10), (Leg::Variational, 1));
        assert_eq!(indexer.leg_and_local(1), (Leg::Fixed, 1));
        assert_eq!(indexer.leg_and_local(5), (Leg::Fixed, 5));
    }

    #[test]
    fn test_indexer_round_trips_through_global_index() {
        let indexer = Indexer::new(5, 5);
        for global in 1..=indexer.n_chains() {
            let (leg, local) = indexer.leg_and_local(global);
            assert_eq!(indexer.global_index(leg, local), global);
        }
    }
}
