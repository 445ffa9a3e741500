use serde::{Deserialize, Serialize};

/// What a replica contributes to a single pairwise swap decision: the log
/// of its acceptance-ratio factor and a private uniform draw. Transmitted
/// wholesale between the two participating processes (it, not replica
/// `state`, is what crosses the network on a swap round), so it must stay
/// small and `Serialize`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwapStat {
    pub log_ratio: f64,
    pub uniform: f64,
}

impl SwapStat {
    pub fn new(log_ratio: f64, uniform: f64) -> Self {
        SwapStat { log_ratio, uniform }
    }
}
