// The orchestration layer: turns a swap graph, a tempering, and a pool of
// replicas into the per-round entry point (`swap`), a replay-and-compare
// correctness check (`checked_round`), a minimal exploration kernel, and
// the convenience loop that strings explore+swap+adapt together.

mod explorer;
mod ladder;
mod run;
mod swap_driver;

pub use explorer::{Explorer, RandomWalkExplorer};
pub use ladder::Ladder;
pub use run::{explore_then_swap, run, RunReport};
pub use swap_driver::{checked_round, swap};
