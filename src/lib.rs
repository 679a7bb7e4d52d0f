#![allow(warnings)]

pub mod cache;
pub mod clients; // External collaborator traits + Jupiter adapter
pub mod config;
pub mod coordinator;
pub mod errors; // Structured error handling
pub mod execution; // Execution records and lifecycle states
pub mod logger;
pub mod worker; // Shared retry/timeout engine
pub mod workers; // Lookup, analysis, builder, transaction

pub use coordinator::{AgentCoordinator, ExecutionResult, StrategyRequest};
pub use errors::{AgentError, AgentResult};
pub use execution::{ExecutionRecord, ExecutionState, StrategyKind};
