// Replica RNGs must be seeded as a pure function of (master_seed, chain_id)
// and nothing else -- never of rank, so that a chain's draw sequence is
// identical no matter how N chains get partitioned across P processes.

#[cfg(test)]
use test_log::test;

pub fn derive_replica_seed(master_seed: u64, chain_id_at_creation: u64) -> u64 {
    rapidhash::rapidhash_seeded(&chain_id_at_creation.to_le_bytes(), master_seed)
}

#[test]
fn test_seed_depends_only_on_chain_id() {
    let a = derive_replica_seed(7, 3);
    let b = derive_replica_seed(7, 3);
    assert_eq!(a, b);
    let c = derive_replica_seed(7, 4);
    assert_ne!(a, c);
}
