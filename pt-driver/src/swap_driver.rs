use pt_admin::AcceptanceRecorder;
use pt_base::{err, ErrorKind, Result};
use pt_net::{Communicator, Entangler, LocalCluster, LocalCommunicator};
use pt_store::{EntangledReplicas, ReplicaCheckpoint};
use pt_swap::{PairSwapper, SwapGraph};
use pt_tempering::State;

/// The entry point for one swap round: resolve each local replica's
/// partner chain and the global slot currently holding it, exchange
/// `SwapStat`s, decide and apply each pairing, then rebuild the
/// chain<->replica mapping in one collective. `entangler` is reused
/// across rounds by the caller -- it is just the communicator plus the
/// fixed block partition, never mutated here.
pub fn swap<C, SW>(
    entangler: &Entangler<C>,
    replicas: &mut EntangledReplicas<State, AcceptanceRecorder, C>,
    swapper: &SW,
    swap_graph: &SwapGraph,
    round: u64,
) -> Result<()>
where
    C: Communicator + Clone,
    SW: PairSwapper<State, AcceptanceRecorder>,
{
    let local_len = replicas.local_len();

    let partner_chains: Vec<u32> = (0..local_len)
        .map(|i| swap_graph.partner_chain(round, replicas.chain(i)))
        .collect::<Result<Vec<u32>>>()?;
    let partner_global_idx = replicas.resolve_partner_global_indices(&partner_chains)?;

    let my_stats: Vec<_> = (0..local_len)
        .map(|i| {
            let chain = replicas.chain(i);
            let replica = replicas.replica_mut(i);
            swapper.swap_stat(chain, &replica.state, partner_chains[i], replica.rng_mut())
        })
        .collect();

    let partner_stats = entangler.transmit(&my_stats, &partner_global_idx)?;

    let mut new_chains = Vec::with_capacity(local_len);
    for i in 0..local_len {
        let chain = replicas.chain(i);
        let partner_chain = partner_chains[i];
        let accepted = swapper.swap_decision(chain, my_stats[i], partner_chain, partner_stats[i]);
        swapper.record_swap_stats(
            &mut replicas.replica_mut(i).recorder,
            chain,
            my_stats[i],
            partner_chain,
            partner_stats[i],
        );
        new_chains.push(if accepted { partner_chain } else { chain });
    }

    for (i, &new_chain) in new_chains.iter().enumerate() {
        replicas.replica_mut(i).chain = new_chain;
    }

    replicas.rebuild_mapping(&new_chains)
}

/// Re-runs round `round` single-threaded and single-process from a
/// `checkpoint_snapshot` taken just before it, and compares the resulting
/// chain assignment against `observed_chains_after` (the same local slots'
/// chains from the actual, possibly distributed, run). Any divergence
/// means the two runs' replicas disagreed on a `swap_decision` despite
/// starting from the same recorded state -- RNG drift or a non-deterministic
/// log-density -- and is the primary cross-process correctness check.
pub fn checked_round<SW>(
    snapshot: &[ReplicaCheckpoint],
    master_seed: u64,
    swapper: &SW,
    swap_graph: &SwapGraph,
    round: u64,
    observed_chains_after: &[u32],
) -> Result<()>
where
    SW: PairSwapper<State, AcceptanceRecorder>,
{
    let n_chains = snapshot.len() as u64;
    let cluster = LocalCluster::new(1);
    let communicator: LocalCommunicator = cluster.communicator(0);

    let mut replicas: EntangledReplicas<State, AcceptanceRecorder, LocalCommunicator> =
        EntangledReplicas::new(n_chains, communicator.clone(), master_seed, |_| Vec::new(), AcceptanceRecorder::new)?;
    replicas.restore_from_snapshot(snapshot)?;

    let entangler = Entangler::new(n_chains, communicator);
    swap(&entangler, &mut replicas, swapper, swap_graph, round)?;

    let replayed_chains: Vec<u32> = (0..replicas.local_len()).map(|i| replicas.chain(i)).collect();
    if replayed_chains != observed_chains_after {
        return Err(err(
            ErrorKind::DecisionDisagreement,
            "checked_round replay diverged from the observed run",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pt_swap::{SwapStat, TestPairSwapper};
    use rand_chacha::ChaCha8Rng;
    use test_log::test;

    fn make_cluster_replicas(
        n_chains: u64,
        size: usize,
    ) -> Vec<(Entangler<LocalCommunicator>, EntangledReplicas<State, AcceptanceRecorder, LocalCommunicator>)> {
        let cluster = LocalCluster::new(size);
        (0..size)
            .map(|rank| {
                let communicator: LocalCommunicator = cluster.communicator(rank);
                let entangler = Entangler::new(n_chains, communicator.clone());
                let replicas = EntangledReplicas::new(n_chains, communicator, 1, |chain| vec![chain as f64], AcceptanceRecorder::new).unwrap();
                (entangler, replicas)
            })
            .collect()
    }

    #[test]
    fn test_single_process_swap_matches_scenario_one() {
        let mut handles = make_cluster_replicas(4, 1);
        let (entangler, replicas) = &mut handles[0];
        let swapper = TestPairSwapper::always_accept();
        let graph = SwapGraph::deo(4);

        swap(entangler, replicas, &swapper, &graph, 1).unwrap();
        let after_round1: Vec<u32> = (0..4).map(|i| replicas.chain(i)).collect();
        assert_eq!(after_round1, vec![2, 1, 4, 3]);

        swap(entangler, replicas, &swapper, &graph, 2).unwrap();
        let partners: Vec<u64> = replicas.resolve_partner_global_indices(&[1, 2, 3, 4]).unwrap();
        assert_eq!(partners, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_two_process_swap_matches_single_process() {
        use std::thread;

        let handles = make_cluster_replicas(4, 2);
        let results: Vec<_> = thread::scope(|scope| {
            handles
                .into_iter()
                .map(|(entangler, mut replicas)| {
                    scope.spawn(move || {
                        let swapper = TestPairSwapper::always_accept();
                        let graph = SwapGraph::deo(4);
                        swap(&entangler, &mut replicas, &swapper, &graph, 1).unwrap();
                        swap(&entangler, &mut replicas, &swapper, &graph, 2).unwrap();
                        (0..replicas.local_len())
                            .map(|i| replicas.chain(i))
                            .collect::<Vec<_>>()
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect()
        });

        let mut all_chains: Vec<u32> = results.into_iter().flatten().collect();
        all_chains.sort_unstable();
        assert_eq!(all_chains, vec![1, 2, 3, 4]);
    }

    /// A swapper whose decision reads straight off `state[0]` instead of a
    /// random draw, so a replay divergence can be forced deterministically:
    /// whichever side holds the lower chain accepts iff its own `state[0]`
    /// is below `0.5`. Stands in for `swap_stat` drawing from `rng` --
    /// `restore_from_snapshot` round-trips `state_blob` and `rng_state_blob`
    /// through the identical path, so corrupting one is exactly as good a
    /// test of `checked_round`'s divergence detection as corrupting the
    /// other.
    struct ThresholdSwapper;

    impl PairSwapper<State, AcceptanceRecorder> for ThresholdSwapper {
        fn swap_stat(&self, _chain: u32, state: &State, _partner_chain: u32, _rng: &mut ChaCha8Rng) -> SwapStat {
            SwapStat::new(0.0, state[0])
        }

        fn swap_decision(&self, chain1: u32, stat1: SwapStat, chain2: u32, stat2: SwapStat) -> bool {
            let authoritative = if chain1 < chain2 { stat1.uniform } else { stat2.uniform };
            authoritative < 0.5
        }

        fn record_swap_stats(
            &self,
            recorder: &mut AcceptanceRecorder,
            chain1: u32,
            stat1: SwapStat,
            chain2: u32,
            stat2: SwapStat,
        ) {
            if chain1 >= chain2 {
                return;
            }
            let accepted = self.swap_decision(chain1, stat1, chain2, stat2);
            recorder.record_swap_acceptance(chain1, chain2, accepted);
        }
    }

    /// Law (a): running `n` rounds then `m` rounds from the same seed lands
    /// on the same chain assignment as running `n+m` rounds in one go --
    /// `swap` carries no hidden state beyond what's already in `replicas`
    /// and `round`, so splitting the round loop anywhere must not matter.
    #[test]
    fn test_n_then_m_rounds_matches_n_plus_m_rounds() {
        let swapper = TestPairSwapper::always_accept();
        let graph = SwapGraph::deo(5);

        let mut split_handles = make_cluster_replicas(5, 1);
        let (split_entangler, split_replicas) = &mut split_handles[0];
        for round in 1..=7u64 {
            swap(split_entangler, split_replicas, &swapper, &graph, round).unwrap();
        }
        for round in 8..=12u64 {
            swap(split_entangler, split_replicas, &swapper, &graph, round).unwrap();
        }
        let split_chains: Vec<u32> = (0..split_replicas.local_len()).map(|i| split_replicas.chain(i)).collect();

        let mut whole_handles = make_cluster_replicas(5, 1);
        let (whole_entangler, whole_replicas) = &mut whole_handles[0];
        for round in 1..=12u64 {
            swap(whole_entangler, whole_replicas, &swapper, &graph, round).unwrap();
        }
        let whole_chains: Vec<u32> = (0..whole_replicas.local_len()).map(|i| whole_replicas.chain(i)).collect();

        assert_eq!(split_chains, whole_chains);
    }

    /// Law (b): with an always-reject swapper, no chain assignment ever
    /// changes, no matter how many rounds run -- not just across one
    /// decision, across an arbitrarily long run.
    #[test]
    fn test_always_reject_swapper_never_changes_any_chain_across_many_rounds() {
        let mut handles = make_cluster_replicas(6, 1);
        let (entangler, replicas) = &mut handles[0];
        let swapper = TestPairSwapper::always_reject();
        let graph = SwapGraph::deo(6);

        let identity: Vec<u32> = (1..=6).collect();
        for round in 1..=20u64 {
            swap(entangler, replicas, &swapper, &graph, round).unwrap();
            let chains: Vec<u32> = (0..replicas.local_len()).map(|i| replicas.chain(i)).collect();
            assert_eq!(chains, identity, "round {round} changed a chain despite an always-reject swapper");
        }
    }

    /// Law (c): with an always-accept swapper, the chain assignment after
    /// round `r` is exactly the composition of the swap graph's first `r`
    /// involutions applied to the identity -- for every `r`, not just
    /// r=1,2.
    #[test]
    fn test_always_accept_swapper_matches_composed_involutions_at_every_round() {
        let mut handles = make_cluster_replicas(5, 1);
        let (entangler, replicas) = &mut handles[0];
        let swapper = TestPairSwapper::always_accept();
        let graph = SwapGraph::deo(5);

        let mut expected: Vec<u32> = (1..=5).collect();
        for round in 1..=12u64 {
            swap(entangler, replicas, &swapper, &graph, round).unwrap();
            expected = expected
                .iter()
                .map(|&chain| graph.partner_chain(round, chain).unwrap())
                .collect();
            let observed: Vec<u32> = (0..replicas.local_len()).map(|i| replicas.chain(i)).collect();
            assert_eq!(observed, expected, "round {round} diverged from the composed involution");
        }
    }

    #[test]
    fn test_checked_round_passes_unperturbed_and_flags_a_perturbed_replica() {
        let cluster = LocalCluster::new(1);
        let comm: LocalCommunicator = cluster.communicator(0);
        let entangler = Entangler::new(4, comm.clone());
        let initial_state = |chain: u32| match chain {
            1 => vec![0.2],
            3 => vec![0.8],
            _ => vec![0.5],
        };
        let mut replicas: EntangledReplicas<State, AcceptanceRecorder, LocalCommunicator> =
            EntangledReplicas::new(4, comm, 1, initial_state, AcceptanceRecorder::new).unwrap();
        let swapper = ThresholdSwapper;
        let graph = SwapGraph::deo(4);

        let snapshot = replicas.checkpoint_snapshot().unwrap();
        swap(&entangler, &mut replicas, &swapper, &graph, 1).unwrap();
        let observed: Vec<u32> = (0..replicas.local_len()).map(|i| replicas.chain(i)).collect();
        // Pair (1,2): chain 1's state 0.2 < 0.5 accepts. Pair (3,4): chain 3's
        // state 0.8 rejects.
        assert_eq!(observed, vec![2, 1, 3, 4]);

        checked_round(&snapshot, 1, &swapper, &graph, 1, &observed).unwrap();

        let mut perturbed = snapshot.clone();
        perturbed[0].state_blob = rmp_serde::to_vec(&vec![0.9_f64]).unwrap();
        let result = checked_round(&perturbed, 1, &swapper, &graph, 1, &observed);
        match result {
            Err(e) => assert_eq!(e.kind(), pt_base::ErrorKind::DecisionDisagreement),
            Ok(()) => panic!("expected checked_round to flag the perturbed replica"),
        }
    }
}
