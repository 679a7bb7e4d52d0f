use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::{AgentError, RecordedError};

/// Strategy tags, each selecting a fixed worker routing sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Swap,
    RebalancePortfolio,
    Stake,
    AnalyzeSafety,
    DetectMev,
    ExecuteDca,
    OptimizeFees,
    Custom,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Swap => "swap",
            StrategyKind::RebalancePortfolio => "rebalance_portfolio",
            StrategyKind::Stake => "stake",
            StrategyKind::AnalyzeSafety => "analyze_safety",
            StrategyKind::DetectMev => "detect_mev",
            StrategyKind::ExecuteDca => "execute_dca",
            StrategyKind::OptimizeFees => "optimize_fees",
            StrategyKind::Custom => "custom",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, AgentError> {
        match raw {
            "swap" => Ok(StrategyKind::Swap),
            "rebalance_portfolio" => Ok(StrategyKind::RebalancePortfolio),
            "stake" => Ok(StrategyKind::Stake),
            "analyze_safety" => Ok(StrategyKind::AnalyzeSafety),
            "detect_mev" => Ok(StrategyKind::DetectMev),
            "execute_dca" => Ok(StrategyKind::ExecuteDca),
            "optimize_fees" => Ok(StrategyKind::OptimizeFees),
            "custom" => Ok(StrategyKind::Custom),
            other => Err(AgentError::UnknownStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Pending,
    Running,
    Simulation,
    ApprovalRequired,
    Approved,
    Executing,
    Confirming,
    Success,
    Failed,
    Cancelled,
}

impl ExecutionState {
    /// Terminal states freeze the record except for explicit archival
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Success | ExecutionState::Failed | ExecutionState::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Success,
    Failed,
}

/// One entry per worker invocation outcome (not per retry attempt)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInfo {
    pub id: String,
    pub name: String,
    pub state: StepState,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Per-invocation mutable state threaded through every worker call.
///
/// `steps` and `errors` are append-only; together they are the full
/// audit trail of one execution and are never pruned. The `data`
/// scratch map is namespaced by producing worker to avoid collisions
/// between workers writing to the same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub strategy: StrategyKind,
    pub state: ExecutionState,
    pub progress: u8,
    pub steps: Vec<StepInfo>,
    pub errors: Vec<RecordedError>,
    pub data: HashMap<String, serde_json::Value>,
    pub transaction_signature: Option<String>,
    pub confirmation_status: Option<String>,
    pub simulation_result: Option<serde_json::Value>,
    pub approval_required: bool,
    pub approval_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(strategy: StrategyKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            strategy,
            state: ExecutionState::Pending,
            progress: 0,
            steps: Vec::new(),
            errors: Vec::new(),
            data: HashMap::new(),
            transaction_signature: None,
            confirmation_status: None,
            simulation_result: None,
            approval_required: false,
            approval_timestamp: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition state. Once terminal the record refuses further
    /// transitions; late writes from an in-flight worker call into a
    /// cancelled record are accepted elsewhere but state stays put.
    pub fn set_state(&mut self, state: ExecutionState) {
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
        self.updated_at = Utc::now();
    }

    /// Progress is monotone non-decreasing within one routing path
    pub fn set_progress(&mut self, progress: u8) {
        let clamped = progress.min(100);
        if clamped > self.progress {
            self.progress = clamped;
            self.updated_at = Utc::now();
        }
    }

    pub fn add_step(&mut self, step: StepInfo) {
        self.steps.push(step);
        self.updated_at = Utc::now();
    }

    pub fn add_error(&mut self, error: RecordedError) {
        self.errors.push(error);
        self.updated_at = Utc::now();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state == ExecutionState::Cancelled
    }

    /// Stage a scratch value under `namespace:key`. Keys are
    /// namespaced by the producing worker so two workers can never
    /// collide on the same record.
    pub fn stage(&mut self, namespace: &str, key: &str, value: serde_json::Value) {
        self.data.insert(format!("{}:{}", namespace, key), value);
        self.updated_at = Utc::now();
    }

    pub fn staged(&self, namespace: &str, key: &str) -> Option<&serde_json::Value> {
        self.data.get(&format!("{}:{}", namespace, key))
    }

    /// Typed read of a staged value; missing or mistyped entries are
    /// validation errors (a routing bug, not a transient condition)
    pub fn staged_as<T: serde::de::DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<T, AgentError> {
        let value = self.staged(namespace, key).ok_or_else(|| {
            AgentError::Validation(format!("Missing staged value {}:{}", namespace, key))
        })?;
        serde_json::from_value(value.clone()).map_err(|e| {
            AgentError::Validation(format!("Staged value {}:{} has wrong shape: {}", namespace, key, e))
        })
    }

    pub fn duration_ms(&self) -> i64 {
        (self.updated_at - self.created_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_state_is_frozen() {
        let mut record = ExecutionRecord::new(StrategyKind::Swap);
        record.set_state(ExecutionState::Running);
        record.set_state(ExecutionState::Failed);
        record.set_state(ExecutionState::Success);
        assert_eq!(record.state, ExecutionState::Failed);
    }

    #[test]
    fn progress_never_decreases() {
        let mut record = ExecutionRecord::new(StrategyKind::Swap);
        record.set_progress(40);
        record.set_progress(20);
        assert_eq!(record.progress, 40);
        record.set_progress(200);
        assert_eq!(record.progress, 100);
    }

    #[test]
    fn scratch_keys_are_namespaced() {
        let mut record = ExecutionRecord::new(StrategyKind::Swap);
        record.stage("lookup", "prices", serde_json::json!({"SOL": 150.0}));
        record.stage("builder", "prices", serde_json::json!({"SOL": 151.0}));
        assert_ne!(
            record.staged("lookup", "prices"),
            record.staged("builder", "prices")
        );
    }

    #[test]
    fn staged_as_reports_missing_values() {
        let record = ExecutionRecord::new(StrategyKind::Swap);
        let result: Result<Vec<String>, _> = record.staged_as("lookup", "holdings");
        assert!(matches!(result, Err(AgentError::Validation(_))));
    }

    #[test]
    fn unknown_strategy_tag_is_a_routing_error() {
        assert!(matches!(
            StrategyKind::parse("yolo_trade"),
            Err(AgentError::UnknownStrategy(_))
        ));
        assert_eq!(
            StrategyKind::parse("rebalance_portfolio").unwrap(),
            StrategyKind::RebalancePortfolio
        );
    }
}
