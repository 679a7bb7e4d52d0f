/// Specialized workers driven by the coordinator
///
/// Lookup reads external reference data (cached), analysis is pure
/// computation over lookup results, builder assembles actionable
/// artifacts, and transaction prepares/simulates/submits. All of
/// them run under the shared retry/timeout envelope in `worker`.

pub mod analysis;
pub mod builder;
pub mod lookup;
pub mod transaction;
