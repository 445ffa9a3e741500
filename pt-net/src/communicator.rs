use std::sync::{Arc, Barrier, Mutex};

#[cfg(test)]
use test_log::test;

/// The transport seam under the Entangler. A real deployment would back
/// this with MPI-style message passing or a TCP mesh; today the workspace
/// ships only [`LocalCommunicator`], which simulates `P` ranks inside a
/// single process so that "same (seed, N), different P" is a one-process
/// test rather than a multi-host harness.
pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// All-to-all exchange of one small count per destination rank.
    fn exchange_counts(&self, counts: &[usize]) -> Vec<usize> {
        let bufs: Vec<Vec<u8>> = counts.iter().map(|c| c.to_le_bytes().to_vec()).collect();
        self.exchange_bytes(bufs)
            .into_iter()
            .map(|b| {
                let mut arr = [0u8; 8];
                let n = b.len().min(8);
                arr[..n].copy_from_slice(&b[..n]);
                usize::from_le_bytes(arr)
            })
            .collect()
    }

    /// Collective: `to_each_rank[r]` is the byte payload this rank sends to
    /// rank `r`; returns what every rank sent to *this* rank, indexed by
    /// sender rank. Every participating rank must call this the same
    /// number of times, in the same order, for the collective to make
    /// sense -- it is a synchronization barrier.
    fn exchange_bytes(&self, to_each_rank: Vec<Vec<u8>>) -> Vec<Vec<u8>>;
}

/// Shared state backing a [`LocalCommunicator`] cluster: one mailbox per
/// simulated rank, and a barrier pairing sends with receives so that the
/// collective completes only once every rank has both deposited its sends
/// and drained its inbox.
pub struct LocalCluster {
    size: usize,
    inboxes: Vec<Mutex<Vec<(usize, Vec<u8>)>>>,
    arrive: Barrier,
    depart: Barrier,
}

impl LocalCluster {
    pub fn new(size: usize) -> Arc<Self> {
        assert!(size > 0, "cluster must have at least one rank");
        Arc::new(LocalCluster {
            size,
            inboxes: (0..size).map(|_| Mutex::new(Vec::new())).collect(),
            arrive: Barrier::new(size),
            depart: Barrier::new(size),
        })
    }

    pub fn communicator(self: &Arc<Self>, rank: usize) -> LocalCommunicator {
        assert!(rank < self.size);
        LocalCommunicator {
            rank,
            cluster: Arc::clone(self),
        }
    }
}

#[derive(Clone)]
pub struct LocalCommunicator {
    rank: usize,
    cluster: Arc<LocalCluster>,
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.cluster.size
    }

    fn exchange_bytes(&self, to_each_rank: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
        assert_eq!(to_each_rank.len(), self.cluster.size, "one payload per rank");
        for (dst, payload) in to_each_rank.into_iter().enumerate() {
            self.cluster.inboxes[dst]
                .lock()
                .unwrap()
                .push((self.rank, payload));
        }
        // Every rank must finish depositing before any rank starts draining,
        // or a fast sender's mail could be read before a slow sender's.
        self.cluster.arrive.wait();
        let mut mine = self.cluster.inboxes[self.rank].lock().unwrap();
        mine.sort_by_key(|(src, _)| *src);
        let mut out = vec![Vec::new(); self.cluster.size];
        for (src, payload) in mine.drain(..) {
            out[src] = payload;
        }
        drop(mine);
        // And every rank must finish draining before the mailboxes are
        // reused by the next collective call.
        self.cluster.depart.wait();
        out
    }
}

#[test]
fn test_local_cluster_round_trip() {
    use std::thread;

    let cluster = LocalCluster::new(3);
    let handles: Vec<_> = (0..3)
        .map(|rank| {
            let comm = cluster.communicator(rank);
            thread::spawn(move || {
                let mut to_each = vec![Vec::new(); 3];
                to_each[(rank + 1) % 3] = vec![rank as u8];
                comm.exchange_bytes(to_each)
            })
        })
        .collect();
    let results: Vec<Vec<Vec<u8>>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    // Rank r receives a 1-byte message from rank (r+2)%3 == r-1.
    for rank in 0..3usize {
        let sender = (rank + 2) % 3;
        assert_eq!(results[rank][sender], vec![sender as u8]);
    }
}
