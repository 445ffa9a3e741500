use pt_base::{err, ErrorKind, Recorder, Result};
use pt_net::{Communicator, Entangler, PermutedDistributedArray};
use rand_chacha::ChaCha8Rng;
use serde::{de::DeserializeOwned, Serialize};

use crate::checkpoint::ReplicaCheckpoint;
use crate::replica::Replica;

#[cfg(test)]
use test_log::test;

/// The distributed replica store: local replicas plus a
/// [`PermutedDistributedArray<u64, _>`] named `chain_to_replica_global_indices`
/// such that `chain_to_replica_global_indices[c]` is the global slot of the
/// replica currently holding chain `c`. This is what makes a swap round's
/// running time independent of replica state size -- no replica `state` is
/// ever transmitted, only this tiny index.
pub struct EntangledReplicas<S, R: Recorder, C: Communicator + Clone> {
    local: Vec<Replica<S, R>>,
    chain_to_replica_global_indices: PermutedDistributedArray<u64, C>,
}

impl<S, R: Recorder, C: Communicator + Clone> EntangledReplicas<S, R, C> {
    /// Creates one replica per chain in this process's range of the block
    /// partition, with `chain_to_replica_global_indices` initialized to the
    /// identity (every replica starts out holding the chain matching its
    /// own global slot).
    pub fn new(
        n_chains: u64,
        communicator: C,
        master_seed: u64,
        mut make_state: impl FnMut(u32) -> S,
        mut make_recorder: impl FnMut() -> R,
    ) -> Result<Self> {
        let entangler = Entangler::new(n_chains, communicator.clone());
        let rank = entangler.rank();
        let my_range = entangler.load().range_for(rank);

        let local: Vec<Replica<S, R>> = my_range
            .clone()
            .map(|g| Replica::new(g as u32, make_state(g as u32), master_seed, make_recorder()))
            .collect();

        let mapping_entangler = Entangler::new(n_chains, communicator);
        let identity_mapping: Vec<u64> = my_range.collect();
        let chain_to_replica_global_indices =
            PermutedDistributedArray::new(mapping_entangler, identity_mapping)?;

        Ok(EntangledReplicas {
            local,
            chain_to_replica_global_indices,
        })
    }

    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    pub fn local_chains(&self) -> impl Iterator<Item = u32> + '_ {
        self.local.iter().map(|r| r.chain)
    }

    pub fn chain(&self, local_slot: usize) -> u32 {
        self.local[local_slot].chain
    }

    pub fn replica(&self, local_slot: usize) -> &Replica<S, R> {
        &self.local[local_slot]
    }

    pub fn replica_mut(&mut self, local_slot: usize) -> &mut Replica<S, R> {
        &mut self.local[local_slot]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Replica<S, R>> {
        self.local.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Replica<S, R>> {
        self.local.iter_mut()
    }

    fn my_global_indices(&self) -> Vec<u64> {
        let load = self.chain_to_replica_global_indices.load();
        load.range_for(self.chain_to_replica_global_indices.rank())
            .collect()
    }

    /// Translates logical partner chains into the global replica slot
    /// currently holding each of them.
    pub fn resolve_partner_global_indices(&self, partner_chains: &[u32]) -> Result<Vec<u64>> {
        let keys: Vec<u64> = partner_chains.iter().map(|&c| c as u64).collect();
        self.chain_to_replica_global_indices.permuted_get(&keys)
    }

    /// Rewrites the chain->replica mapping for the new chain each local
    /// replica now holds after a swap round. `new_chains[i]` must be the
    /// chain local replica `i` holds *after* the round; their union across
    /// processes must be a permutation of `1..=n`, which `permuted_set`
    /// enforces, surfacing [`pt_base::ErrorKind::PermutationViolation`]
    /// if the post-round assignment is not one.
    pub fn rebuild_mapping(&mut self, new_chains: &[u32]) -> Result<()> {
        let keys: Vec<u64> = new_chains.iter().map(|&c| c as u64).collect();
        let values = self.my_global_indices();
        if keys.len() != values.len() {
            return Err(err(
                ErrorKind::PermutationViolation,
                "new_chains length does not match local replica count",
            ));
        }
        self.chain_to_replica_global_indices
            .permuted_set(&keys, &values)
    }
}

impl<S, R, C> EntangledReplicas<S, R, C>
where
    S: Serialize + DeserializeOwned,
    R: Recorder,
    C: Communicator + Clone,
{
    pub fn checkpoint_snapshot(&self) -> Result<Vec<ReplicaCheckpoint>> {
        self.local
            .iter()
            .map(|r| {
                Ok(ReplicaCheckpoint {
                    chain: r.chain,
                    state_blob: rmp_serde::to_vec(&r.state)?,
                    rng_state_blob: rmp_serde::to_vec(&r.rng_state())?,
                })
            })
            .collect()
    }

    pub fn restore_from_snapshot(&mut self, snapshots: &[ReplicaCheckpoint]) -> Result<()> {
        if snapshots.len() != self.local.len() {
            return Err(err(
                ErrorKind::PermutationViolation,
                "checkpoint replica count does not match local replica count",
            ));
        }
        for (replica, snap) in self.local.iter_mut().zip(snapshots) {
            replica.chain = snap.chain;
            replica.state = rmp_serde::from_slice(&snap.state_blob)?;
            let rng: ChaCha8Rng = rmp_serde::from_slice(&snap.rng_state_blob)?;
            replica.restore_rng(rng);
        }
        // A checkpoint can be taken mid-run, after the chain a replica
        // holds has drifted from its global slot; the mapping has to be
        // rebuilt to match or `resolve_partner_global_indices` would keep
        // answering with the pre-restore (usually identity) assignment.
        let restored_chains: Vec<u32> = self.local.iter().map(|r| r.chain).collect();
        self.rebuild_mapping(&restored_chains)
    }
}

#[test]
fn test_identity_mapping_resolves_own_chains() {
    use pt_net::{LocalCluster, LocalCommunicator};

    let cluster = LocalCluster::new(1);
    let comm: LocalCommunicator = cluster.communicator(0);
    let replicas: EntangledReplicas<i64, pt_base::NullRecorder, LocalCommunicator> =
        EntangledReplicas::new(4, comm, 1, |chain| chain as i64, || pt_base::NullRecorder)
            .unwrap();
    assert_eq!(replicas.local_chains().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    let partner_chains: Vec<u32> = vec![2, 1, 4, 3];
    let resolved = replicas.resolve_partner_global_indices(&partner_chains).unwrap();
    assert_eq!(resolved, vec![2, 1, 4, 3]);
}
