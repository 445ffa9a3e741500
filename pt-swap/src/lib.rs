// Swap-round mechanics: the fixed chain<->chain involution for a round
// (`SwapGraph`), the per-pair acceptance statistic and decision rule
// (`SwapStat`, `PairSwapper`), and the reference/test implementations used
// to validate the whole driver without a real target distribution.

mod pair_swapper;
mod swap_graph;
mod swap_stat;

pub use pair_swapper::{swap_decision, DefaultPairSwapper, PairSwapper, TestPairSwapper};
pub use swap_graph::SwapGraph;
pub use swap_stat::SwapStat;
