// Annealing path, schedule, and the two tempering shapes (plain NRPT and
// variational-with-folded-legs) that produce the log-potentials and swap
// graph a swap round consumes.

mod indexer;
mod path;
mod schedule;
mod tempering;

pub use indexer::{Indexer, Leg};
pub use path::{LinearPath, LogPotential, Path, State};
pub use schedule::{adapt_schedule, equally_spaced_schedule};
pub use tempering::{create_pair_swapper, concatenate_log_potentials, NonReversiblePT, Tempering, VariationalPT};
