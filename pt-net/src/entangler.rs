use serde::{de::DeserializeOwned, Serialize};

use pt_base::{err, Error, ErrorKind, Result};

use crate::{Communicator, Load};

#[cfg(test)]
use test_log::test;

/// Permutes payloads across processes by global index: `values[i]` is the
/// payload owned by local slot `i`, `destinations[i]` is the global index
/// of the slot that should receive it. After `transmit`, local slot `i`
/// holds whatever some sender designated for the global index owned by
/// local slot `i`.
///
/// Pure function of its inputs and the fixed `load` partition. If the
/// union of `destinations` across all processes is not a permutation of
/// `1..=n`, every process fails with [`ErrorKind::PermutationViolation`].
pub struct Entangler<C: Communicator> {
    communicator: C,
    load: Load,
}

impl<C: Communicator> Entangler<C> {
    pub fn new(n: u64, communicator: C) -> Self {
        let load = Load::new(n, communicator.size());
        Entangler { communicator, load }
    }

    pub fn load(&self) -> &Load {
        &self.load
    }

    pub fn rank(&self) -> usize {
        self.communicator.rank()
    }

    pub fn local_count(&self) -> usize {
        self.load.local_count(self.communicator.rank())
    }

    pub fn communicator(&self) -> &C {
        &self.communicator
    }

    pub fn transmit<T>(&self, values: &[T], destinations: &[u64]) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let my_count = self.local_count();
        if values.len() != my_count || destinations.len() != my_count {
            return Err(err(
                ErrorKind::PermutationViolation,
                "values/destinations length does not match local slot count",
            ));
        }

        let p = self.communicator.size();
        let mut buckets: Vec<Vec<(u64, T)>> = vec![Vec::new(); p];
        for (value, &dst) in values.iter().zip(destinations.iter()) {
            if dst < 1 || dst > self.load.n() {
                return Err(err(
                    ErrorKind::PermutationViolation,
                    "destination global index out of range",
                ));
            }
            let owner = self.load.owner(dst);
            let offset = self.load.local_offset(dst);
            buckets[owner].push((offset, value.clone()));
        }

        let to_each_rank: Vec<Vec<u8>> = buckets
            .iter()
            .map(|bucket| rmp_serde::to_vec(bucket).map_err(|e| Error::new(ErrorKind::CommunicationFailure, e)))
            .collect::<std::result::Result<_, _>>()?;

        let received = self.communicator.exchange_bytes(to_each_rank);

        let mut slots: Vec<Option<T>> = (0..my_count).map(|_| None).collect();
        for buf in received {
            if buf.is_empty() {
                continue;
            }
            let items: Vec<(u64, T)> =
                rmp_serde::from_slice(&buf).map_err(|e| Error::new(ErrorKind::CommunicationFailure, e))?;
            for (offset, value) in items {
                let idx = offset as usize;
                if idx >= slots.len() || slots[idx].is_some() {
                    return Err(err(
                        ErrorKind::PermutationViolation,
                        "duplicate or out-of-range destination within a rank",
                    ));
                }
                slots[idx] = Some(value);
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| {
                    err(
                        ErrorKind::PermutationViolation,
                        format!("local slot {i} received no payload"),
                    )
                })
            })
            .collect()
    }
}

#[test]
fn test_transmit_single_process_identity_swap() {
    use crate::{LocalCluster, LocalCommunicator};

    let cluster = LocalCluster::new(1);
    let comm: LocalCommunicator = cluster.communicator(0);
    let ent: Entangler<LocalCommunicator> = Entangler::new(4, comm);
    // Swap neighbours 1<->2 and 3<->4.
    let values = vec![10u64, 20, 30, 40];
    let destinations = vec![2u64, 1, 4, 3];
    let received = ent.transmit(&values, &destinations).unwrap();
    assert_eq!(received, vec![20, 10, 40, 30]);
}

#[test]
fn test_transmit_rejects_non_permutation() {
    use crate::{LocalCluster, LocalCommunicator};

    let cluster = LocalCluster::new(1);
    let comm: LocalCommunicator = cluster.communicator(0);
    let ent: Entangler<LocalCommunicator> = Entangler::new(4, comm);
    let values = vec![1u64, 2, 3, 4];
    // Two replicas both target global index 1; index 3 is never targeted.
    let destinations = vec![1u64, 1, 2, 4];
    assert!(ent.transmit(&values, &destinations).is_err());
}

#[test]
fn test_transmit_across_two_simulated_processes() {
    use crate::LocalCluster;
    use std::thread;

    let cluster = LocalCluster::new(2);
    let handles: Vec<_> = (0..2)
        .map(|rank| {
            let comm = cluster.communicator(rank);
            thread::spawn(move || {
                let ent = Entangler::new(4, comm);
                // load: rank 0 owns [1,2], rank 1 owns [3,4].
                let (values, destinations) = if rank == 0 {
                    (vec![10u64, 20], vec![2u64, 1])
                } else {
                    (vec![30u64, 40], vec![4u64, 3])
                };
                ent.transmit(&values, &destinations).unwrap()
            })
        })
        .collect();
    let results: Vec<Vec<u64>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0], vec![20, 10]);
    assert_eq!(results[1], vec![40, 30]);
}
