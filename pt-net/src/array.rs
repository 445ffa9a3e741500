use serde::{de::DeserializeOwned, Deserialize, Serialize};

use pt_base::{err, Error, ErrorKind, Result};

use crate::{Communicator, Entangler, Load};

#[cfg(test)]
use test_log::test;

/// A logical vector of length `n`, physically partitioned across `p`
/// processes by the Entangler's fixed `load`. Global logical state is
/// defined by concatenating local payloads in rank order.
pub struct PermutedDistributedArray<T, C: Communicator> {
    entangler: Entangler<C>,
    local: Vec<T>,
}

#[derive(Serialize, Deserialize)]
struct GetRequest {
    requester_slot: u64,
    global_index: u64,
}

#[derive(Serialize, Deserialize)]
struct GetResponse<T> {
    requester_slot: u64,
    value: T,
}

impl<T, C> PermutedDistributedArray<T, C>
where
    T: Serialize + DeserializeOwned + Clone,
    C: Communicator,
{
    pub fn new(entangler: Entangler<C>, local: Vec<T>) -> Result<Self> {
        if local.len() != entangler.local_count() {
            return Err(err(
                ErrorKind::PermutationViolation,
                "initial local payload size does not match load partition",
            ));
        }
        Ok(PermutedDistributedArray { entangler, local })
    }

    pub fn local(&self) -> &[T] {
        &self.local
    }

    pub fn load(&self) -> &Load {
        self.entangler.load()
    }

    pub fn rank(&self) -> usize {
        self.entangler.rank()
    }

    /// Each local slot names a global index; returns the value currently at
    /// that index. Implemented as the round-trip described by the swap
    /// core's design: requests go to owners, owners reply with values, the
    /// requester permutes responses back into local-slot order.
    pub fn permuted_get(&self, indices: &[u64]) -> Result<Vec<T>> {
        let load = self.entangler.load();
        let p = load.size();

        let mut req_buckets: Vec<Vec<GetRequest>> = (0..p).map(|_| Vec::new()).collect();
        for (slot, &g) in indices.iter().enumerate() {
            if g < 1 || g > load.n() {
                return Err(err(
                    ErrorKind::PermutationViolation,
                    "requested global index out of range",
                ));
            }
            req_buckets[load.owner(g)].push(GetRequest {
                requester_slot: slot as u64,
                global_index: g,
            });
        }
        let req_bytes: Vec<Vec<u8>> = req_buckets
            .iter()
            .map(|bucket| rmp_serde::to_vec(bucket).map_err(|e| Error::new(ErrorKind::CommunicationFailure, e)))
            .collect::<std::result::Result<_, _>>()?;
        let incoming_requests = self.entangler.communicator().exchange_bytes(req_bytes);

        let mut resp_buckets: Vec<Vec<GetResponse<T>>> = (0..p).map(|_| Vec::new()).collect();
        for (sender_rank, buf) in incoming_requests.into_iter().enumerate() {
            if buf.is_empty() {
                continue;
            }
            let reqs: Vec<GetRequest> =
                rmp_serde::from_slice(&buf).map_err(|e| Error::new(ErrorKind::CommunicationFailure, e))?;
            for req in reqs {
                let local_off = load.local_offset(req.global_index) as usize;
                let value = self.local.get(local_off).cloned().ok_or_else(|| {
                    err(
                        ErrorKind::PermutationViolation,
                        "requested global index resolves outside owner's local range",
                    )
                })?;
                resp_buckets[sender_rank].push(GetResponse {
                    requester_slot: req.requester_slot,
                    value,
                });
            }
        }
        let resp_bytes: Vec<Vec<u8>> = resp_buckets
            .iter()
            .map(|bucket| rmp_serde::to_vec(bucket).map_err(|e| Error::new(ErrorKind::CommunicationFailure, e)))
            .collect::<std::result::Result<_, _>>()?;
        let incoming_responses = self.entangler.communicator().exchange_bytes(resp_bytes);

        let mut out: Vec<Option<T>> = (0..indices.len()).map(|_| None).collect();
        for buf in incoming_responses {
            if buf.is_empty() {
                continue;
            }
            let resps: Vec<GetResponse<T>> =
                rmp_serde::from_slice(&buf).map_err(|e| Error::new(ErrorKind::CommunicationFailure, e))?;
            for resp in resps {
                out[resp.requester_slot as usize] = Some(resp.value);
            }
        }
        out.into_iter()
            .enumerate()
            .map(|(i, v)| {
                v.ok_or_else(|| {
                    err(
                        ErrorKind::PermutationViolation,
                        format!("local slot {i} got no response to its permuted_get request"),
                    )
                })
            })
            .collect()
    }

    /// Each local slot supplies a `(key, value)` pair; writes `value` at
    /// global index `key`. Requires the union of `keys` across processes to
    /// be a permutation of `1..=n` -- this is exactly the Entangler's
    /// `transmit` primitive, scattering by destination global index.
    pub fn permuted_set(&mut self, keys: &[u64], values: &[T]) -> Result<()> {
        if keys.len() != values.len() {
            return Err(err(
                ErrorKind::PermutationViolation,
                "keys/values length mismatch in permuted_set",
            ));
        }
        self.local = self.entangler.transmit(values, keys)?;
        Ok(())
    }
}

#[test]
fn test_permuted_get_single_process() {
    use crate::LocalCluster;

    let cluster = LocalCluster::new(1);
    let ent = Entangler::new(4, cluster.communicator(0));
    let arr = PermutedDistributedArray::new(ent, vec![100u64, 200, 300, 400]).unwrap();
    let got = arr.permuted_get(&[3, 1, 4, 2]).unwrap();
    assert_eq!(got, vec![300, 100, 400, 200]);
}

#[test]
fn test_permuted_get_and_set_across_two_processes() {
    use crate::LocalCluster;
    use std::thread;

    let cluster = LocalCluster::new(2);
    let handles: Vec<_> = (0..2)
        .map(|rank| {
            let comm = cluster.communicator(rank);
            thread::spawn(move || {
                let ent = Entangler::new(4, comm);
                let local = if rank == 0 {
                    vec![1u64, 2]
                } else {
                    vec![3u64, 4]
                };
                let mut arr = PermutedDistributedArray::new(ent, local).unwrap();
                // Every rank asks for the global value at index 1 and at index 4.
                let got = arr.permuted_get(&[1, 4]).unwrap();
                // Now reverse the whole array via permuted_set.
                let my_range: Vec<u64> = arr.load().range_for(rank).collect();
                let reversed_keys: Vec<u64> = my_range.iter().map(|g| 5 - g).collect();
                let values = arr.local().to_vec();
                arr.permuted_set(&reversed_keys, &values).unwrap();
                (got, arr.local().to_vec())
            })
        })
        .collect();
    let results: Vec<(Vec<u64>, Vec<u64>)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0].0, vec![1, 4]);
    assert_eq!(results[1].0, vec![1, 4]);
    // After reversing [1,2,3,4] -> [4,3,2,1]: rank 0 owns [1,2] -> holds [4,3].
    assert_eq!(results[0].1, vec![4, 3]);
    assert_eq!(results[1].1, vec![2, 1]);
}
