/// Structured error handling for the agent framework
///
/// One taxonomy for every worker and the coordinator. Retryability
/// follows the transport-level classification used by the retry
/// engine: timeouts and transient network failures retry, anything
/// that indicates a bad request or an invalid transaction does not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Fee ceiling exceeded: estimated {estimated_sol} SOL > ceiling {ceiling_sol} SOL")]
    FeeCeilingExceeded { estimated_sol: f64, ceiling_sol: f64 },

    #[error("Confirmation timeout: {signature} not confirmed after {polls} polls")]
    ConfirmationTimeout { signature: String, polls: u32 },

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Severity bucket recorded alongside each terminal error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Message substrings that mark an error as transient.
/// Matches transport failures surfaced by HTTP/RPC clients.
const RETRYABLE_PATTERNS: [&str; 6] = [
    "timeout",
    "connection refused",
    "connection reset",
    "etimedout",
    "rate limit",
    "429",
];

impl AgentError {
    /// Stable machine-readable code stored on the execution record
    pub fn code(&self) -> &'static str {
        match self {
            AgentError::Validation(_) => "validation",
            AgentError::Timeout { .. } => "timeout",
            AgentError::Network(_) => "transient_network",
            AgentError::Api(_) => "api_error",
            AgentError::SimulationFailed(_) => "simulation_failure",
            AgentError::FeeCeilingExceeded { .. } => "fee_ceiling_exceeded",
            AgentError::ConfirmationTimeout { .. } => "confirmation_timeout",
            AgentError::SendFailed(_) => "send_failed",
            AgentError::UnknownStrategy(_) => "unknown_strategy",
            AgentError::UnknownAction(_) => "unknown_action",
            AgentError::Serialization(_) => "serialization",
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AgentError::Validation(_) => ErrorSeverity::Medium,
            AgentError::Timeout { .. } => ErrorSeverity::Medium,
            AgentError::Network(_) => ErrorSeverity::Medium,
            AgentError::Api(_) => ErrorSeverity::Medium,
            AgentError::SimulationFailed(_) => ErrorSeverity::High,
            AgentError::FeeCeilingExceeded { .. } => ErrorSeverity::High,
            AgentError::ConfirmationTimeout { .. } => ErrorSeverity::High,
            AgentError::SendFailed(_) => ErrorSeverity::High,
            AgentError::UnknownStrategy(_) => ErrorSeverity::Critical,
            AgentError::UnknownAction(_) => ErrorSeverity::Critical,
            AgentError::Serialization(_) => ErrorSeverity::Medium,
        }
    }

    /// Whether the retry engine may attempt this operation again.
    ///
    /// Timeouts are always retryable. Hard failures (validation,
    /// simulation, fee ceiling, routing) never are. Everything else
    /// is classified by inspecting the message for transient
    /// transport patterns.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentError::Timeout { .. } => true,
            AgentError::Validation(_)
            | AgentError::SimulationFailed(_)
            | AgentError::FeeCeilingExceeded { .. }
            | AgentError::ConfirmationTimeout { .. }
            | AgentError::UnknownStrategy(_)
            | AgentError::UnknownAction(_)
            | AgentError::Serialization(_) => false,
            AgentError::Network(msg) | AgentError::Api(msg) | AgentError::SendFailed(msg) => {
                let lower = msg.to_lowercase();
                RETRYABLE_PATTERNS.iter().any(|p| lower.contains(p))
            }
        }
    }
}

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AgentError::Timeout { seconds: 0 }
        } else {
            AgentError::Network(err.to_string())
        }
    }
}

/// Serializable error form appended to `ExecutionRecord.errors`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedError {
    pub code: String,
    pub message: String,
    pub severity: ErrorSeverity,
    pub retryable: bool,
    pub retry_count: u32,
    pub max_retries: u32,
    pub timestamp: DateTime<Utc>,
    pub context: Option<serde_json::Value>,
}

impl RecordedError {
    pub fn from_error(
        error: &AgentError,
        retry_count: u32,
        max_retries: u32,
        context: Option<serde_json::Value>,
    ) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            severity: error.severity(),
            retryable: error.is_retryable(),
            retry_count,
            max_retries,
            timestamp: Utc::now(),
            context,
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
