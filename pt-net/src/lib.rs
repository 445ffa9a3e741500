// The Entangler is the peer-to-peer collective underlying every
// cross-process swap: it permutes payloads across processes by global
// index. Everything in this crate is a pure function of its inputs plus
// the fixed `load` partition; no global ordering among processes is
// relied on beyond rank identity.

mod array;
mod communicator;
mod entangler;
mod load;

pub use array::PermutedDistributedArray;
pub use communicator::{Communicator, LocalCluster, LocalCommunicator};
pub use entangler::Entangler;
pub use load::Load;
