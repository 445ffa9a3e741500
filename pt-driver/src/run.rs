use std::sync::Arc;
use std::thread;

use pt_admin::{AcceptanceRecorder, Config};
use pt_base::{err, ErrorKind, Result};
use pt_net::{Entangler, LocalCluster, LocalCommunicator};
use pt_store::{EntangledReplicas, Replica, ReplicaCheckpoint};
use pt_tempering::{create_pair_swapper, LogPotential, Path, State, Tempering};

use crate::explorer::Explorer;
use crate::ladder::Ladder;
use crate::swap_driver::{checked_round, swap};

/// Runs `explorer` once on every local replica, then `swap` once, on round
/// `round`. Adaptation (replacing `tempering` with a new snapshot) is the
/// caller's job -- this is the single per-round step the Non-goals' "no
/// requirement of a general driver loop" leaves room for.
pub fn explore_then_swap<T>(
    entangler: &Entangler<LocalCommunicator>,
    replicas: &mut EntangledReplicas<State, AcceptanceRecorder, LocalCommunicator>,
    tempering: &Arc<T>,
    explorer: &(impl Explorer + Sync),
    round: u64,
    multithreaded: bool,
) -> Result<()>
where
    T: Tempering + Send + Sync + 'static,
{
    run_exploration(replicas, tempering, explorer, multithreaded);
    let swapper = create_pair_swapper(Arc::clone(tempering));
    swap(entangler, replicas, &swapper, tempering.swap_graph(), round)
}

fn log_potential_for<T>(tempering: &Arc<T>, chain: u32) -> LogPotential
where
    T: Tempering + Send + Sync + 'static,
{
    let tempering = Arc::clone(tempering);
    Arc::new(move |state: &State| tempering.log_potential(chain, state))
}

fn run_exploration<T>(
    replicas: &mut EntangledReplicas<State, AcceptanceRecorder, LocalCommunicator>,
    tempering: &Arc<T>,
    explorer: &(impl Explorer + Sync),
    multithreaded: bool,
) where
    T: Tempering + Send + Sync + 'static,
{
    if !multithreaded {
        for replica in replicas.iter_mut() {
            let log_potential = log_potential_for(tempering, replica.chain);
            let (state, rng) = replica.state_and_rng_mut();
            explorer.explore(state, &log_potential, rng);
        }
        return;
    }

    let local: Vec<&mut Replica<State, AcceptanceRecorder>> = replicas.iter_mut().collect();
    thread::scope(|scope| {
        for replica in local {
            let log_potential = log_potential_for(tempering, replica.chain);
            scope.spawn(move || {
                let (state, rng) = replica.state_and_rng_mut();
                explorer.explore(state, &log_potential, rng);
            });
        }
    });
}

/// One full run: builds a single-process [`Ladder`] from `path` (and, when
/// `config.is_variational()`, `variational_path`), runs `config.n_rounds`
/// rounds of explore-then-swap, re-adapting the schedule after round 1 (and
/// every round thereafter if `config.continuous_adaptation`), and reports
/// the final chain assignment plus diagnostics. A convenience wrapper for
/// single-process callers, not a generalized multi-process driver loop.
///
/// `config.checked_round`, when nonzero, replays that round from a
/// checkpoint taken just before it and fails the run on any disagreement
/// (`pt_base::ErrorKind::DecisionDisagreement`). `config.checkpoint`, when
/// set, keeps the snapshot taken after the final round on the report
/// instead of discarding it -- `run` never writes one to disk, that is
/// left to the caller.
pub fn run(
    config: &Config,
    path: Arc<dyn Path>,
    variational_path: Option<Arc<dyn Path>>,
    mut initial_state: impl FnMut(u32) -> State,
    explorer: &(impl Explorer + Sync),
) -> Result<RunReport> {
    if config.is_variational() != variational_path.is_some() {
        return Err(err(
            ErrorKind::Other,
            "config.n_chains_variational and variational_path must be set together",
        ));
    }

    let n_chains_total = config.n_chains as u64 + config.n_chains_variational as u64;

    let cluster = LocalCluster::new(1);
    let communicator: LocalCommunicator = cluster.communicator(0);
    let entangler = Entangler::new(n_chains_total, communicator.clone());

    let mut replicas: EntangledReplicas<State, AcceptanceRecorder, LocalCommunicator> =
        EntangledReplicas::new(
            n_chains_total,
            communicator,
            config.seed,
            |chain| initial_state(chain),
            AcceptanceRecorder::new,
        )?;

    let mut tempering = Arc::new(Ladder::initial(config, path, variational_path));
    let mut final_checkpoint = None;

    for round in 1..=config.n_rounds {
        let need_snapshot = config.checkpoint || (config.checked_round > 0 && round == config.checked_round);
        let pre_round_snapshot = if need_snapshot {
            Some(replicas.checkpoint_snapshot()?)
        } else {
            None
        };

        run_exploration(&mut replicas, &tempering, explorer, config.multithreaded);
        let swapper = create_pair_swapper(Arc::clone(&tempering));
        swap(&entangler, &mut replicas, &swapper, tempering.swap_graph(), round)?;

        if config.checked_round > 0 && round == config.checked_round {
            let observed: Vec<u32> = (0..replicas.local_len()).map(|i| replicas.chain(i)).collect();
            checked_round(
                pre_round_snapshot.as_deref().expect("snapshot taken above"),
                config.seed,
                &swapper,
                tempering.swap_graph(),
                round,
                &observed,
            )?;
            tracing::info!(round, "checked round replayed and agreed with the observed assignment");
        }

        if config.checkpoint {
            final_checkpoint = Some(replicas.checkpoint_snapshot()?);
        }

        let should_adapt = round == 1 || config.continuous_adaptation;
        if should_adapt {
            let mut merged = AcceptanceRecorder::new();
            for replica in replicas.iter() {
                merged.merge(&replica.recorder);
            }
            tempering = Arc::new(tempering.adapt(&merged));
        }
    }

    let mut merged = AcceptanceRecorder::new();
    for replica in replicas.iter() {
        merged.merge(&replica.recorder);
    }

    let final_chains: Vec<u32> = (0..replicas.local_len()).map(|i| replicas.chain(i)).collect();
    Ok(RunReport {
        rounds_run: config.n_rounds,
        final_chains,
        global_barrier: tempering.global_barrier(),
        acceptance_rates: merged.adjacent_acceptance_rates(n_chains_total as u32),
        final_checkpoint,
    })
}

/// Summary of a completed `run`: the final chain assignment (local-slot
/// order; single-process runs have exactly one slot per chain), the
/// tempering's final global barrier estimate, the final round's
/// adjacent-pair acceptance rates, and -- when `config.checkpoint` was set
/// -- the snapshot taken after the final round.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub rounds_run: u64,
    pub final_chains: Vec<u32>,
    pub global_barrier: f64,
    pub acceptance_rates: Vec<f64>,
    pub final_checkpoint: Option<Vec<ReplicaCheckpoint>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::RandomWalkExplorer;
    use pt_tempering::LinearPath;
    use test_log::test;

    fn gaussian_path(mean_reference: f64, mean_target: f64) -> Arc<dyn Path> {
        let log_reference: LogPotential = Arc::new(move |x: &State| -(x[0] - mean_reference).powi(2) / 2.0);
        let log_target: LogPotential = Arc::new(move |x: &State| -(x[0] - mean_target).powi(2) / 2.0);
        Arc::new(LinearPath::new(log_reference, log_target))
    }

    fn normal_log_density(mean: f64, x: &State) -> f64 {
        -(x[0] - mean).powi(2) / 2.0
    }

    /// An unidentifiable product target: `log p1(x) + log p2(x)` for two
    /// Gaussian factors offset from one another, against a diffuse
    /// (wide-variance) reference.
    fn product_scenario_path() -> Arc<dyn Path> {
        let log_reference: LogPotential = Arc::new(|x: &State| -(x[0] * x[0]) / (2.0 * 100.0_f64.powi(2)));
        let log_target: LogPotential = Arc::new(|x: &State| normal_log_density(-1.5, x) + normal_log_density(1.5, x));
        Arc::new(LinearPath::new(log_reference, log_target))
    }

    #[test]
    fn test_global_barrier_converges_near_one_point_three_nine_for_the_product_scenario() {
        let config = Config {
            seed: 11,
            n_rounds: 1024,
            n_chains: 4,
            continuous_adaptation: true,
            ..Config::default()
        };
        let explorer = RandomWalkExplorer::new(1.0);
        let report = run(&config, product_scenario_path(), None, |_| vec![0.0], &explorer).unwrap();
        assert!(
            (report.global_barrier - 1.39).abs() < 0.1,
            "expected global barrier near 1.39, got {}",
            report.global_barrier
        );
    }

    #[test]
    fn test_global_barrier_converges_near_three_point_one_five_for_the_normal_scenario() {
        let config = Config {
            seed: 13,
            n_rounds: 1024,
            n_chains: 8,
            continuous_adaptation: true,
            ..Config::default()
        };
        let explorer = RandomWalkExplorer::new(1.0);
        let report = run(&config, gaussian_path(-3.0, 3.0), None, |_| vec![0.0], &explorer).unwrap();
        assert!(
            (report.global_barrier - 3.15).abs() < 0.1,
            "expected global barrier near 3.15, got {}",
            report.global_barrier
        );
    }

    #[test]
    fn test_run_produces_a_permutation_of_chains() {
        let config = Config {
            seed: 1,
            n_rounds: 20,
            n_chains: 6,
            ..Config::default()
        };
        let explorer = RandomWalkExplorer::new(0.5);
        let report = run(&config, gaussian_path(-3.0, 3.0), None, |_| vec![0.0], &explorer).unwrap();
        let mut chains = report.final_chains.clone();
        chains.sort_unstable();
        assert_eq!(chains, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_run_is_deterministic_for_fixed_seed() {
        let config = Config {
            seed: 7,
            n_rounds: 15,
            n_chains: 5,
            ..Config::default()
        };
        let explorer = RandomWalkExplorer::new(0.3);
        let report1 = run(&config, gaussian_path(-2.0, 2.0), None, |_| vec![0.0], &explorer).unwrap();
        let report2 = run(&config, gaussian_path(-2.0, 2.0), None, |_| vec![0.0], &explorer).unwrap();
        assert_eq!(report1.final_chains, report2.final_chains);
    }

    #[test]
    fn test_run_rejects_mismatched_variational_config_and_path() {
        let config = Config {
            n_chains_variational: 4,
            ..Config::default()
        };
        let explorer = RandomWalkExplorer::new(0.5);
        let result = run(&config, gaussian_path(-3.0, 3.0), None, |_| vec![0.0], &explorer);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_builds_a_variational_ladder_when_configured() {
        let config = Config {
            seed: 3,
            n_rounds: 10,
            n_chains: 4,
            n_chains_variational: 4,
            ..Config::default()
        };
        let explorer = RandomWalkExplorer::new(0.5);
        let report = run(
            &config,
            gaussian_path(-3.0, 3.0),
            Some(gaussian_path(-1.0, 3.0)),
            |_| vec![0.0],
            &explorer,
        )
        .unwrap();
        let mut chains = report.final_chains.clone();
        chains.sort_unstable();
        assert_eq!(chains, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_run_with_checkpoint_reports_a_snapshot_of_every_replica() {
        let config = Config {
            seed: 4,
            n_rounds: 5,
            n_chains: 4,
            checkpoint: true,
            ..Config::default()
        };
        let explorer = RandomWalkExplorer::new(0.5);
        let report = run(&config, gaussian_path(-3.0, 3.0), None, |_| vec![0.0], &explorer).unwrap();
        assert_eq!(report.final_checkpoint.unwrap().len(), 4);
    }

    #[test]
    fn test_run_with_checked_round_agrees_on_an_unperturbed_run() {
        let config = Config {
            seed: 5,
            n_rounds: 6,
            n_chains: 4,
            checked_round: 3,
            ..Config::default()
        };
        let explorer = RandomWalkExplorer::new(0.5);
        let report = run(&config, gaussian_path(-3.0, 3.0), None, |_| vec![0.0], &explorer).unwrap();
        assert_eq!(report.rounds_run, 6);
    }
}
