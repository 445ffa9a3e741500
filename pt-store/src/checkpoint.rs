use serde::{Deserialize, Serialize};

/// Per-replica persisted state pinned for bit-identical reload: reloading
/// and continuing must reproduce exactly the next-round output a
/// never-checkpointed run would have produced. Blobs are `rmp-serde`
/// encoded, the workspace's established wire format.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplicaCheckpoint {
    pub chain: u32,
    pub state_blob: Vec<u8>,
    pub rng_state_blob: Vec<u8>,
}

/// Run-global checkpoint header: the schedule (as `N` doubles) and the
/// round counter. Grouped so a whole-run checkpoint is one
/// `rmp_serde::to_vec` call away from a byte buffer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckpointHeader {
    pub round: u64,
    pub schedule: Vec<f64>,
}
