// Storage of per-replica mutable state, and the chain<->replica mapping
// that lets the swap driver resolve "which physical slot holds chain c"
// without ever moving replica state over the network.

mod checkpoint;
mod replica;
mod replicas;

pub use checkpoint::{CheckpointHeader, ReplicaCheckpoint};
pub use replica::Replica;
pub use replicas::EntangledReplicas;
