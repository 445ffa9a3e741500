use pt_base::{derive_replica_seed, Recorder};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[cfg(test)]
use test_log::test;

/// One physical slot: an integer `chain` (the current annealing-parameter
/// index), an opaque target-domain sample `state`, a private RNG, and a
/// `recorder`. A replica is created once at initialization and lives for
/// the entire run; only `chain` and `state` mutate, and both mutate only
/// inside a swap round (`state` also between rounds, by the exploration
/// kernel -- outside this crate's concern).
pub struct Replica<S, R: Recorder> {
    pub chain: u32,
    pub state: S,
    rng: ChaCha8Rng,
    pub recorder: R,
}

impl<S, R: Recorder> Replica<S, R> {
    /// `chain_id_at_creation` seeds the RNG once and for all: it must be
    /// the chain this physical slot starts with, never the slot's rank or
    /// any later `chain` value, so that a chain's draw sequence is
    /// independent of how replicas are partitioned across processes.
    pub fn new(chain_id_at_creation: u32, state: S, master_seed: u64, recorder: R) -> Self {
        let seed = derive_replica_seed(master_seed, chain_id_at_creation as u64);
        Replica {
            chain: chain_id_at_creation,
            state,
            rng: ChaCha8Rng::seed_from_u64(seed),
            recorder,
        }
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Disjoint borrow of `state` and `rng` at once, for callers (like the
    /// exploration kernel) that need to mutate one while drawing from the
    /// other in the same call.
    pub fn state_and_rng_mut(&mut self) -> (&mut S, &mut ChaCha8Rng) {
        (&mut self.state, &mut self.rng)
    }

    pub fn rng_state(&self) -> ChaCha8Rng {
        self.rng.clone()
    }

    pub fn restore_rng(&mut self, rng: ChaCha8Rng) {
        self.rng = rng;
    }
}

#[test]
fn test_seed_is_independent_of_creation_chain_identity_only() {
    let r1: Replica<(), pt_base::NullRecorder> = Replica::new(3, (), 42, pt_base::NullRecorder);
    let r2: Replica<(), pt_base::NullRecorder> = Replica::new(3, (), 42, pt_base::NullRecorder);
    // Two replicas created the same way draw the same first u32.
    let mut a = r1;
    let mut b = r2;
    use rand::RngCore;
    assert_eq!(a.rng_mut().next_u32(), b.rng_mut().next_u32());
}
