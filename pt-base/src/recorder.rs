// The statistics sink a replica carries. Out of scope beyond this
// interface: aggregation across replicas/rounds is an external
// collaborator's job (see pt-admin::AcceptanceRecorder for the one this
// workspace ships).

/// What the swap core calls into a replica's recorder for. Implementations
/// live closer to the concerns that consume them (`pt-admin` ships the
/// built-in ones); this trait is in `pt-base` because it is used by
/// `pt-store`, `pt-swap`, and `pt-tempering` alike.
pub trait Recorder {
    fn record_swap_acceptance(&mut self, chain1: u32, chain2: u32, accepted: bool);
    fn record_numeric_degeneracy(&mut self, chain: u32);
}

/// Discards everything. Used by `TestSwapper`-driven tests that only care
/// about the resulting permutation, not recorded statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn record_swap_acceptance(&mut self, _chain1: u32, _chain2: u32, _accepted: bool) {}
    fn record_numeric_degeneracy(&mut self, _chain: u32) {}
}
