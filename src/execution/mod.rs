/// Execution state tracking
///
/// One `ExecutionRecord` per strategy invocation, owned by the
/// coordinator for its lifetime and mutated by whichever worker is
/// currently running under the sequential-execution guarantee.

mod record;

pub use record::{
    ExecutionRecord, ExecutionState, StepInfo, StepState, StrategyKind,
};
