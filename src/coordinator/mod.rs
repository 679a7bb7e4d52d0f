/// Coordinator - routes strategies across the specialized workers
///
/// Owns the execution records, the cancellation set and the worker
/// instances. Each strategy tag selects a fixed routing sequence;
/// every step runs under the shared retry/timeout envelope and its
/// outcome is written back to the shared record map so status reads
/// always see the latest snapshot.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::clients::{
    ConfirmationLevel, InstructionStep, PreparedTransaction, QuoteApi, QuoteRequest, QuoteResponse,
    RiskLevel, RpcInterface, SigningService, TokenOracle,
};
use crate::config::AgentConfig;
use crate::errors::{AgentError, AgentResult, RecordedError};
use crate::execution::{ExecutionRecord, ExecutionState, StrategyKind};
use crate::logger::{self, LogTag};
use crate::worker::{execute_step, ProgressCallback};
use crate::workers::analysis::{AnalysisWorker, MevCandidate, PricePoint};
use crate::workers::builder::{BuilderWorker, DcaInterval};
use crate::workers::lookup::LookupWorker;
use crate::workers::transaction::{FeeEstimate, TransactionWorker};

/// Caller-facing strategy parameters. Every field is optional; each
/// routing path validates the subset it needs up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyRequest {
    pub wallet_address: Option<String>,
    pub input_mint: Option<String>,
    pub output_mint: Option<String>,
    pub amount: Option<u64>,
    pub slippage_bps: Option<u16>,
    pub fee_ceiling_sol: Option<f64>,
    /// Transactions park at the approval gate unless explicitly
    /// waived by the caller
    pub require_approval: bool,
    /// Target allocations for rebalancing, mint -> percent
    pub targets: HashMap<String, f64>,
    pub dca_total_amount: Option<f64>,
    pub dca_interval: Option<String>,
    pub dca_iterations: Option<u32>,
    pub mint: Option<String>,
    pub mints: Vec<String>,
    pub mev_candidates: Vec<MevCandidate>,
    pub instructions: Vec<InstructionStep>,
    /// Action vocabulary for the custom strategy
    pub actions: Vec<String>,
    pub price_history: Vec<PricePoint>,
    /// Cost basis per mint for harvest estimates (USD)
    pub cost_basis: HashMap<String, f64>,
}

impl Default for StrategyRequest {
    fn default() -> Self {
        Self {
            wallet_address: None,
            input_mint: None,
            output_mint: None,
            amount: None,
            slippage_bps: None,
            fee_ceiling_sol: None,
            require_approval: true,
            targets: HashMap::new(),
            dca_total_amount: None,
            dca_interval: None,
            dca_iterations: None,
            mint: None,
            mints: Vec::new(),
            mev_candidates: Vec::new(),
            instructions: Vec::new(),
            actions: Vec::new(),
            price_history: Vec::new(),
            cost_basis: HashMap::new(),
        }
    }
}

/// Compact outcome returned to the caller; the full audit trail
/// stays on the record and is readable via `get_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: String,
    pub success: bool,
    pub state: ExecutionState,
    pub errors: Vec<RecordedError>,
    pub duration_ms: i64,
}

impl ExecutionResult {
    fn from_record(record: &ExecutionRecord) -> Self {
        Self {
            execution_id: record.id.clone(),
            success: record.state == ExecutionState::Success,
            state: record.state,
            errors: record.errors.clone(),
            duration_ms: record.duration_ms(),
        }
    }
}

pub struct AgentCoordinator {
    lookup: LookupWorker,
    analysis: AnalysisWorker,
    builder: BuilderWorker,
    transaction: TransactionWorker,
    config: AgentConfig,
    records: RwLock<HashMap<String, ExecutionRecord>>,
    cancel_requests: RwLock<HashSet<String>>,
    progress: Option<ProgressCallback>,
}

impl AgentCoordinator {
    pub fn new(
        rpc: Arc<dyn RpcInterface>,
        oracle: Arc<dyn TokenOracle>,
        quote_api: Arc<dyn QuoteApi>,
        signer: Arc<dyn SigningService>,
        config: AgentConfig,
    ) -> Self {
        Self {
            lookup: LookupWorker::new(oracle, rpc.clone(), &config),
            analysis: AnalysisWorker::new(&config),
            builder: BuilderWorker::new(quote_api, &config),
            transaction: TransactionWorker::new(rpc, signer, &config),
            config,
            records: RwLock::new(HashMap::new()),
            cancel_requests: RwLock::new(HashSet::new()),
            progress: None,
        }
    }

    /// Observe record snapshots as steps complete
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Run one strategy end to end. Worker failures land on the
    /// record and come back inside the result; only a malformed
    /// strategy tag raises before a record exists.
    pub async fn execute_strategy(
        &self,
        strategy: &str,
        request: StrategyRequest,
    ) -> AgentResult<ExecutionResult> {
        let kind = StrategyKind::parse(strategy)?;
        let mut record = ExecutionRecord::new(kind);
        logger::info(
            LogTag::Coordinator,
            "EXECUTION_START",
            &format!("id={} strategy={}", record.id, kind),
        );
        record.set_state(ExecutionState::Running);
        self.write_back(&record).await;

        let outcome = self.route(&mut record, kind, &request).await;
        if let Err(err) = &outcome {
            // A cancelled record is already terminal and carries no
            // failure; the failing step recorded itself, routing-level
            // validation failures still need a record entry
            if !record.is_cancelled() {
                if record.errors.is_empty() {
                    record.add_error(RecordedError::from_error(err, 0, 0, None));
                }
                record.set_state(ExecutionState::Failed);
            }
        }
        self.write_back(&record).await;

        logger::info(
            LogTag::Coordinator,
            "EXECUTION_DONE",
            &format!(
                "id={} state={:?} steps={} errors={}",
                record.id,
                record.state,
                record.steps.len(),
                record.errors.len()
            ),
        );
        Ok(ExecutionResult::from_record(&record))
    }

    async fn route(
        &self,
        record: &mut ExecutionRecord,
        kind: StrategyKind,
        request: &StrategyRequest,
    ) -> AgentResult<()> {
        match kind {
            StrategyKind::Swap => self.run_swap(record, request).await,
            StrategyKind::RebalancePortfolio => self.run_rebalance(record, request).await,
            StrategyKind::Stake => self.run_stake(record, request).await,
            StrategyKind::AnalyzeSafety => self.run_analyze_safety(record, request).await,
            StrategyKind::DetectMev => self.run_detect_mev(record, request).await,
            StrategyKind::ExecuteDca => self.run_dca(record, request).await,
            StrategyKind::OptimizeFees => self.run_optimize_fees(record, request).await,
            StrategyKind::Custom => self.run_custom(record, request).await,
        }
    }

    // ---- routing paths ----

    async fn run_swap(
        &self,
        record: &mut ExecutionRecord,
        request: &StrategyRequest,
    ) -> AgentResult<()> {
        let input_mint = require(&request.input_mint, "input_mint")?;
        let output_mint = require(&request.output_mint, "output_mint")?;
        let wallet = require(&request.wallet_address, "wallet_address")?;
        let amount = request
            .amount
            .filter(|a| *a > 0)
            .ok_or_else(|| AgentError::Validation("amount must be positive".to_string()))?;

        let input_meta = execute_step(
            record,
            LookupWorker::NAME,
            "resolve_input_metadata",
            self.lookup.config(),
            10,
            self.progress.as_ref(),
            || self.lookup.resolve_token_metadata(&input_mint),
        )
        .await?;
        self.checkpoint(record).await?;

        let output_meta = execute_step(
            record,
            LookupWorker::NAME,
            "resolve_output_metadata",
            self.lookup.config(),
            20,
            self.progress.as_ref(),
            || self.lookup.resolve_token_metadata(&output_mint),
        )
        .await?;
        record.stage(
            crate::workers::lookup::NAMESPACE,
            "metadata",
            serde_json::json!({ "input": input_meta, "output": output_meta }),
        );
        self.checkpoint(record).await?;

        let price_mints = vec![input_mint.clone(), output_mint.clone()];
        let prices = execute_step(
            record,
            LookupWorker::NAME,
            "fetch_prices",
            self.lookup.config(),
            30,
            self.progress.as_ref(),
            || self.lookup.fetch_prices(&price_mints),
        )
        .await?;
        record.stage(
            crate::workers::lookup::NAMESPACE,
            "prices",
            serde_json::to_value(&prices)?,
        );
        self.checkpoint(record).await?;

        let quote_request = QuoteRequest {
            input_mint: input_mint.clone(),
            output_mint: output_mint.clone(),
            amount,
            slippage_bps: request.slippage_bps.unwrap_or(50),
        };
        let quote: QuoteResponse = execute_step(
            record,
            BuilderWorker::NAME,
            "route_quote",
            self.builder.config(),
            45,
            self.progress.as_ref(),
            || self.builder.route_quote(&quote_request),
        )
        .await?;
        record.stage(
            crate::workers::builder::NAMESPACE,
            "quote",
            serde_json::to_value(&quote)?,
        );
        self.checkpoint(record).await?;

        let instructions = execute_step(
            record,
            BuilderWorker::NAME,
            "build_swap_instructions",
            self.builder.config(),
            55,
            self.progress.as_ref(),
            || async { self.builder.build_swap_instructions(&quote) },
        )
        .await?;
        record.stage(
            crate::workers::builder::NAMESPACE,
            "instructions",
            serde_json::to_value(&instructions)?,
        );
        self.checkpoint(record).await?;

        self.run_transaction_pipeline(record, &instructions, &wallet, request, request.require_approval)
            .await
    }

    async fn run_rebalance(
        &self,
        record: &mut ExecutionRecord,
        request: &StrategyRequest,
    ) -> AgentResult<()> {
        let wallet = require(&request.wallet_address, "wallet_address")?;
        if request.targets.is_empty() {
            return Err(AgentError::Validation(
                "rebalance_portfolio needs target allocations".to_string(),
            ));
        }

        let holdings = execute_step(
            record,
            LookupWorker::NAME,
            "fetch_wallet_holdings",
            self.lookup.config(),
            15,
            self.progress.as_ref(),
            || self.lookup.fetch_wallet_holdings(&wallet),
        )
        .await?;
        record.stage(
            crate::workers::lookup::NAMESPACE,
            "holdings",
            serde_json::to_value(&holdings)?,
        );
        self.checkpoint(record).await?;

        let mints: Vec<String> = holdings.iter().map(|h| h.mint.clone()).collect();
        let prices = execute_step(
            record,
            LookupWorker::NAME,
            "fetch_prices",
            self.lookup.config(),
            30,
            self.progress.as_ref(),
            || self.lookup.fetch_prices(&mints),
        )
        .await?;
        self.checkpoint(record).await?;

        let plan = execute_step(
            record,
            BuilderWorker::NAME,
            "build_rebalance_plan",
            self.builder.config(),
            55,
            self.progress.as_ref(),
            || async { self.builder.build_rebalance_plan(&holdings, &prices, &request.targets) },
        )
        .await?;
        record.stage(
            crate::workers::builder::NAMESPACE,
            "rebalance_plan",
            serde_json::to_value(&plan)?,
        );
        self.checkpoint(record).await?;

        if plan.actions.is_empty() {
            // Nothing drifted past tolerance; a no-op rebalance is a
            // successful one
            record.set_progress(100);
            record.set_state(ExecutionState::Success);
            return Ok(());
        }

        // Rebalances always park for operator review; the plan is the
        // artifact being approved, not a prepared transaction
        let description = format!(
            "rebalance {} assets, total ${:.2}",
            plan.actions.len(),
            plan.total_value_usd
        );
        let approval_id = execute_step(
            record,
            TransactionWorker::NAME,
            "request_approval",
            self.transaction.config(),
            80,
            self.progress.as_ref(),
            || {
                let fee = FeeEstimate {
                    base_fee_lamports: 0,
                    priority_fee_lamports: 0,
                    total_fee_sol: 0.0,
                    units_consumed: 0,
                };
                let description = description.clone();
                async move {
                    self.transaction
                        .request_approval(&description, &fee, RiskLevel::Medium)
                        .await
                }
            },
        )
        .await?;
        record.stage(
            crate::workers::transaction::NAMESPACE,
            "approval_id",
            serde_json::json!(approval_id),
        );
        record.approval_required = true;
        record.set_state(ExecutionState::ApprovalRequired);
        Ok(())
    }

    async fn run_stake(
        &self,
        record: &mut ExecutionRecord,
        request: &StrategyRequest,
    ) -> AgentResult<()> {
        let wallet = require(&request.wallet_address, "wallet_address")?;
        if request.instructions.is_empty() {
            return Err(AgentError::Validation(
                "stake needs prepared staking instructions".to_string(),
            ));
        }
        record.set_progress(20);
        // Staking locks funds, so the approval gate cannot be waived
        self.run_transaction_pipeline(record, &request.instructions, &wallet, request, true)
            .await
    }

    async fn run_analyze_safety(
        &self,
        record: &mut ExecutionRecord,
        request: &StrategyRequest,
    ) -> AgentResult<()> {
        let mint = require(&request.mint, "mint")?;

        let metadata = execute_step(
            record,
            LookupWorker::NAME,
            "resolve_token_metadata",
            self.lookup.config(),
            20,
            self.progress.as_ref(),
            || self.lookup.resolve_token_metadata(&mint),
        )
        .await?;
        self.checkpoint(record).await?;

        let holders = execute_step(
            record,
            LookupWorker::NAME,
            "fetch_holder_distribution",
            self.lookup.config(),
            40,
            self.progress.as_ref(),
            || self.lookup.fetch_holder_distribution(&mint),
        )
        .await?;
        self.checkpoint(record).await?;

        let liquidity = execute_step(
            record,
            LookupWorker::NAME,
            "fetch_liquidity_depth",
            self.lookup.config(),
            60,
            self.progress.as_ref(),
            || self.lookup.fetch_liquidity_depth(&mint),
        )
        .await?;
        self.checkpoint(record).await?;

        let report = execute_step(
            record,
            AnalysisWorker::NAME,
            "token_safety_score",
            self.analysis.config(),
            90,
            self.progress.as_ref(),
            || async {
                Ok(self
                    .analysis
                    .token_safety_score(&metadata, &holders, &liquidity, Utc::now()))
            },
        )
        .await?;
        record.stage(
            crate::workers::analysis::NAMESPACE,
            "safety_report",
            serde_json::to_value(&report)?,
        );

        record.set_progress(100);
        record.set_state(ExecutionState::Success);
        Ok(())
    }

    async fn run_detect_mev(
        &self,
        record: &mut ExecutionRecord,
        request: &StrategyRequest,
    ) -> AgentResult<()> {
        if request.mev_candidates.is_empty() {
            return Err(AgentError::Validation(
                "detect_mev needs candidate transactions".to_string(),
            ));
        }

        let opportunities = execute_step(
            record,
            AnalysisWorker::NAME,
            "detect_mev_opportunities",
            self.analysis.config(),
            90,
            self.progress.as_ref(),
            || async { Ok(self.analysis.detect_mev_opportunities(&request.mev_candidates)) },
        )
        .await?;
        record.stage(
            crate::workers::analysis::NAMESPACE,
            "mev_opportunities",
            serde_json::to_value(&opportunities)?,
        );

        record.set_progress(100);
        record.set_state(ExecutionState::Success);
        Ok(())
    }

    async fn run_dca(
        &self,
        record: &mut ExecutionRecord,
        request: &StrategyRequest,
    ) -> AgentResult<()> {
        let input_mint = require(&request.input_mint, "input_mint")?;
        let output_mint = require(&request.output_mint, "output_mint")?;
        let total = request.dca_total_amount.ok_or_else(|| {
            AgentError::Validation("execute_dca needs dca_total_amount".to_string())
        })?;
        let interval = DcaInterval::parse(
            request
                .dca_interval
                .as_deref()
                .ok_or_else(|| AgentError::Validation("execute_dca needs dca_interval".to_string()))?,
        )?;
        let iterations = request.dca_iterations.ok_or_else(|| {
            AgentError::Validation("execute_dca needs dca_iterations".to_string())
        })?;

        let schedule = execute_step(
            record,
            BuilderWorker::NAME,
            "build_dca_schedule",
            self.builder.config(),
            90,
            self.progress.as_ref(),
            || async {
                self.builder.build_dca_schedule(
                    &input_mint,
                    &output_mint,
                    total,
                    interval,
                    iterations,
                    Utc::now(),
                )
            },
        )
        .await?;
        record.stage(
            crate::workers::builder::NAMESPACE,
            "dca_schedule",
            serde_json::to_value(&schedule)?,
        );

        record.set_progress(100);
        record.set_state(ExecutionState::Success);
        Ok(())
    }

    async fn run_optimize_fees(
        &self,
        record: &mut ExecutionRecord,
        request: &StrategyRequest,
    ) -> AgentResult<()> {
        let wallet = require(&request.wallet_address, "wallet_address")?;
        if request.instructions.is_empty() {
            return Err(AgentError::Validation(
                "optimize_fees needs the instructions to price".to_string(),
            ));
        }

        let tx = execute_step(
            record,
            TransactionWorker::NAME,
            "prepare_transaction",
            self.transaction.config(),
            30,
            self.progress.as_ref(),
            || self.transaction.prepare(&request.instructions, &wallet),
        )
        .await?;
        self.checkpoint(record).await?;

        record.set_state(ExecutionState::Simulation);
        let outcome = execute_step(
            record,
            TransactionWorker::NAME,
            "simulate_transaction",
            self.transaction.config(),
            60,
            self.progress.as_ref(),
            || self.transaction.simulate(&tx),
        )
        .await?;
        record.simulation_result = Some(serde_json::to_value(&outcome)?);
        self.checkpoint(record).await?;

        // Recommendation only; this path never signs or submits
        let fee = self.transaction.estimate_fee(&outcome);
        record.stage(
            crate::workers::transaction::NAMESPACE,
            "fee_recommendation",
            serde_json::to_value(&fee)?,
        );

        record.set_progress(100);
        record.set_state(ExecutionState::Success);
        Ok(())
    }

    async fn run_custom(
        &self,
        record: &mut ExecutionRecord,
        request: &StrategyRequest,
    ) -> AgentResult<()> {
        if request.actions.is_empty() {
            return Err(AgentError::Validation(
                "custom strategy needs at least one action".to_string(),
            ));
        }

        let total = request.actions.len();
        for (i, action) in request.actions.iter().enumerate() {
            let progress_after = ((i + 1) * 90 / total) as u8;
            let staged = execute_step(
                record,
                "custom",
                action,
                self.lookup.config(),
                progress_after,
                self.progress.as_ref(),
                || self.run_custom_action(action, request),
            )
            .await?;
            record.stage(action_namespace(action), action, staged);
            self.checkpoint(record).await?;
        }

        record.set_progress(100);
        record.set_state(ExecutionState::Success);
        Ok(())
    }

    /// Action vocabulary for the custom strategy. Anything outside
    /// the vocabulary is a routing error, not a transient failure.
    async fn run_custom_action(
        &self,
        action: &str,
        request: &StrategyRequest,
    ) -> AgentResult<serde_json::Value> {
        match action {
            "fetch_prices" => {
                let prices = self.lookup.fetch_prices(&request.mints).await?;
                Ok(serde_json::to_value(prices)?)
            }
            "fetch_holdings" => {
                let wallet = require(&request.wallet_address, "wallet_address")?;
                let holdings = self.lookup.fetch_wallet_holdings(&wallet).await?;
                Ok(serde_json::to_value(holdings)?)
            }
            "fetch_metadata" => {
                let mint = require(&request.mint, "mint")?;
                let metadata = self.lookup.resolve_token_metadata(&mint).await?;
                Ok(serde_json::to_value(metadata)?)
            }
            "analyze_trend" => {
                let mint = require(&request.mint, "mint")?;
                let report = self.analysis.analyze_trend(&mint, &request.price_history);
                Ok(serde_json::to_value(report)?)
            }
            "find_harvest_candidates" => {
                let wallet = require(&request.wallet_address, "wallet_address")?;
                let holdings = self.lookup.fetch_wallet_holdings(&wallet).await?;
                let mints: Vec<String> = holdings.iter().map(|h| h.mint.clone()).collect();
                let prices = self.lookup.fetch_prices(&mints).await?;
                let candidates =
                    self.builder
                        .find_harvest_candidates(&holdings, &prices, &request.cost_basis);
                Ok(serde_json::to_value(candidates)?)
            }
            other => Err(AgentError::UnknownAction(other.to_string())),
        }
    }

    // ---- shared transaction pipeline ----

    /// Prepare, simulate, price, gate and (unless parked) submit
    async fn run_transaction_pipeline(
        &self,
        record: &mut ExecutionRecord,
        instructions: &[InstructionStep],
        fee_payer: &str,
        request: &StrategyRequest,
        require_approval: bool,
    ) -> AgentResult<()> {
        let tx = execute_step(
            record,
            TransactionWorker::NAME,
            "prepare_transaction",
            self.transaction.config(),
            65,
            self.progress.as_ref(),
            || self.transaction.prepare(instructions, fee_payer),
        )
        .await?;
        self.checkpoint(record).await?;

        record.set_state(ExecutionState::Simulation);
        let outcome = execute_step(
            record,
            TransactionWorker::NAME,
            "simulate_transaction",
            self.transaction.config(),
            75,
            self.progress.as_ref(),
            || self.transaction.simulate(&tx),
        )
        .await?;
        record.simulation_result = Some(serde_json::to_value(&outcome)?);
        self.checkpoint(record).await?;

        let fee = execute_step(
            record,
            TransactionWorker::NAME,
            "check_fee_ceiling",
            self.transaction.config(),
            80,
            self.progress.as_ref(),
            || async {
                let fee = self.transaction.estimate_fee(&outcome);
                self.transaction
                    .check_fee_ceiling(&fee, request.fee_ceiling_sol)?;
                Ok(fee)
            },
        )
        .await?;
        record.stage(
            crate::workers::transaction::NAMESPACE,
            "fee_estimate",
            serde_json::to_value(&fee)?,
        );
        self.checkpoint(record).await?;

        let risk = self.transaction.risk_label(&fee, record.strategy);

        if require_approval {
            let description = format!(
                "{}: {} instructions, fee {:.6} SOL",
                record.strategy,
                instructions.len(),
                fee.total_fee_sol
            );
            let approval_id = execute_step(
                record,
                TransactionWorker::NAME,
                "request_approval",
                self.transaction.config(),
                85,
                self.progress.as_ref(),
                || self.transaction.request_approval(&description, &fee, risk),
            )
            .await?;
            record.stage(
                crate::workers::transaction::NAMESPACE,
                "approval_id",
                serde_json::json!(approval_id),
            );
            record.stage(
                crate::workers::transaction::NAMESPACE,
                "prepared_tx",
                serde_json::to_value(&tx)?,
            );
            record.approval_required = true;
            record.set_state(ExecutionState::ApprovalRequired);
            return Ok(());
        }

        self.submit_and_confirm(record, &tx).await
    }

    /// Sign, send and poll to confirmation. Shared by the direct path
    /// and approval resumption.
    async fn submit_and_confirm(
        &self,
        record: &mut ExecutionRecord,
        tx: &PreparedTransaction,
    ) -> AgentResult<()> {
        record.set_state(ExecutionState::Executing);
        self.write_back(record).await;

        let sent = execute_step(
            record,
            TransactionWorker::NAME,
            "sign_and_send",
            self.transaction.config(),
            90,
            self.progress.as_ref(),
            || self.transaction.sign_and_send(tx),
        )
        .await?;
        record.transaction_signature = Some(sent.signature.clone());
        record.set_state(ExecutionState::Confirming);
        self.write_back(record).await;

        // The polling window needs its own envelope: no unit retries,
        // step timeout past the last poll
        let confirm_config = self.transaction.confirmation_config();
        let level: ConfirmationLevel = execute_step(
            record,
            TransactionWorker::NAME,
            "await_confirmation",
            &confirm_config,
            99,
            self.progress.as_ref(),
            || self.transaction.await_confirmation(&sent.signature),
        )
        .await?;

        record.confirmation_status = Some(format!("{:?}", level).to_lowercase());
        record.set_progress(100);
        record.set_state(ExecutionState::Success);
        Ok(())
    }

    // ---- record management ----

    /// Advisory cancellation: flags the execution so the next step
    /// boundary stops it. A step already in flight runs to completion.
    pub async fn cancel_execution(&self, execution_id: &str) -> bool {
        let records = self.records.read().await;
        let eligible = records
            .get(execution_id)
            .map(|r| !r.state.is_terminal())
            .unwrap_or(false);
        drop(records);
        if eligible {
            self.cancel_requests
                .write()
                .await
                .insert(execution_id.to_string());
            logger::info(
                LogTag::Coordinator,
                "CANCEL_REQUESTED",
                &format!("id={}", execution_id),
            );
        }
        eligible
    }

    pub async fn get_status(&self, execution_id: &str) -> Option<ExecutionRecord> {
        self.records.read().await.get(execution_id).cloned()
    }

    /// All records, newest first
    pub async fn get_history(&self) -> Vec<ExecutionRecord> {
        let records = self.records.read().await;
        let mut all: Vec<ExecutionRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Resume a parked execution. With a staged transaction the
    /// pipeline continues through sign, send and confirm; plan-style
    /// approvals (no staged transaction) complete immediately.
    pub async fn approve_execution(&self, execution_id: &str) -> AgentResult<ExecutionResult> {
        // Claim the record under the write lock: the state check and
        // the flip to approved are one atomic compare-and-set, so a
        // second concurrent approval finds the record already claimed
        // and can never re-submit the transaction
        let mut record = {
            let mut records = self.records.write().await;
            let record = records.get_mut(execution_id).ok_or_else(|| {
                AgentError::Validation(format!("Unknown execution: {}", execution_id))
            })?;
            if record.state != ExecutionState::ApprovalRequired {
                return Err(AgentError::Validation(format!(
                    "Execution {} is not awaiting approval",
                    execution_id
                )));
            }
            record.approval_timestamp = Some(Utc::now());
            record.set_state(ExecutionState::Approved);
            record.clone()
        };
        logger::info(
            LogTag::Coordinator,
            "EXECUTION_APPROVED",
            &format!("id={}", execution_id),
        );

        let staged_tx: Option<PreparedTransaction> = record
            .staged_as(crate::workers::transaction::NAMESPACE, "prepared_tx")
            .ok();
        let outcome = match staged_tx {
            Some(tx) => self.submit_and_confirm(&mut record, &tx).await,
            None => {
                record.set_progress(100);
                record.set_state(ExecutionState::Success);
                Ok(())
            }
        };
        if outcome.is_err() {
            record.set_state(ExecutionState::Failed);
        }
        self.write_back(&record).await;
        Ok(ExecutionResult::from_record(&record))
    }

    /// Decline a parked execution; it lands in cancelled, terminally
    pub async fn reject_execution(&self, execution_id: &str) -> AgentResult<ExecutionResult> {
        let mut records = self.records.write().await;
        let record = records.get_mut(execution_id).ok_or_else(|| {
            AgentError::Validation(format!("Unknown execution: {}", execution_id))
        })?;
        if record.state != ExecutionState::ApprovalRequired {
            return Err(AgentError::Validation(format!(
                "Execution {} is not awaiting approval",
                execution_id
            )));
        }
        record.set_state(ExecutionState::Cancelled);
        logger::info(
            LogTag::Coordinator,
            "EXECUTION_REJECTED",
            &format!("id={}", execution_id),
        );
        Ok(ExecutionResult::from_record(record))
    }

    /// Drop a terminal record from the in-memory map
    pub async fn archive_execution(&self, execution_id: &str) -> AgentResult<ExecutionRecord> {
        let mut records = self.records.write().await;
        let terminal = records
            .get(execution_id)
            .map(|r| r.state.is_terminal())
            .ok_or_else(|| {
                AgentError::Validation(format!("Unknown execution: {}", execution_id))
            })?;
        if !terminal {
            return Err(AgentError::Validation(format!(
                "Execution {} is still active",
                execution_id
            )));
        }
        self.cancel_requests.write().await.remove(execution_id);
        Ok(records.remove(execution_id).unwrap())
    }

    /// Step boundary: persist the snapshot and honor any pending
    /// cancellation request
    async fn checkpoint(&self, record: &mut ExecutionRecord) -> AgentResult<()> {
        if self.cancel_requests.read().await.contains(&record.id) {
            record.set_state(ExecutionState::Cancelled);
            self.write_back(record).await;
            logger::info(
                LogTag::Coordinator,
                "EXECUTION_CANCELLED",
                &format!("id={} progress={}", record.id, record.progress),
            );
            return Err(AgentError::Validation(format!(
                "Execution {} cancelled",
                record.id
            )));
        }
        self.write_back(record).await;
        Ok(())
    }

    async fn write_back(&self, record: &ExecutionRecord) {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Scratch keys are namespaced by the worker that produced the value,
/// so custom-action outputs land under their producing worker
fn action_namespace(action: &str) -> &'static str {
    match action {
        "analyze_trend" => crate::workers::analysis::NAMESPACE,
        "find_harvest_candidates" => crate::workers::builder::NAMESPACE,
        _ => crate::workers::lookup::NAMESPACE,
    }
}

fn require(field: &Option<String>, name: &str) -> AgentResult<String> {
    field
        .as_ref()
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| AgentError::Validation(format!("Missing required field: {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{
        HolderDistribution, LiquidityDepth, PriceInfo, QuoteResponse, RoutePlanStep,
        SignAndSendResult, SimulationOutcome, TokenHolding, TokenMetadata,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    struct StubRpc {
        simulation_err: Option<String>,
        units: u64,
    }

    #[async_trait]
    impl RpcInterface for StubRpc {
        async fn get_balance(&self, _address: &str) -> AgentResult<u64> {
            Ok(10_000_000_000)
        }
        async fn get_latest_blockhash(&self) -> AgentResult<String> {
            Ok("Blockhash111".to_string())
        }
        async fn simulate_transaction(
            &self,
            _tx: &PreparedTransaction,
        ) -> AgentResult<SimulationOutcome> {
            Ok(SimulationOutcome {
                err: self.simulation_err.clone(),
                units_consumed: Some(self.units),
                logs: Vec::new(),
            })
        }
        async fn send_transaction(&self, _tx: &PreparedTransaction) -> AgentResult<String> {
            Ok("Sig111".to_string())
        }
        async fn get_signature_status(
            &self,
            _signature: &str,
        ) -> AgentResult<Option<ConfirmationLevel>> {
            Ok(Some(ConfirmationLevel::Finalized))
        }
        async fn get_token_accounts(&self, _owner: &str) -> AgentResult<Vec<TokenHolding>> {
            Ok(vec![
                TokenHolding {
                    mint: "MintA".to_string(),
                    amount: 700.0,
                    decimals: 6,
                },
                TokenHolding {
                    mint: "MintB".to_string(),
                    amount: 300.0,
                    decimals: 6,
                },
            ])
        }
    }

    struct StubOracle;

    #[async_trait]
    impl TokenOracle for StubOracle {
        async fn metadata(&self, mint: &str) -> AgentResult<TokenMetadata> {
            Ok(TokenMetadata {
                mint: mint.to_string(),
                symbol: "TOK".to_string(),
                name: "Token".to_string(),
                decimals: 6,
                verified: true,
                created_at: Some(Utc::now() - chrono::Duration::days(30)),
                upgrade_authority: None,
                freeze_authority: None,
            })
        }
        async fn prices(
            &self,
            mints: &[String],
        ) -> AgentResult<HashMap<String, PriceInfo>> {
            Ok(mints
                .iter()
                .map(|m| {
                    (
                        m.clone(),
                        PriceInfo {
                            price_usd: 1.0,
                            change_24h_pct: 0.0,
                        },
                    )
                })
                .collect())
        }
        async fn holder_distribution(&self, mint: &str) -> AgentResult<HolderDistribution> {
            Ok(HolderDistribution {
                mint: mint.to_string(),
                top_holder_pct: Some(4.0),
                holder_count: Some(50_000),
                concentration: crate::clients::Concentration::Low,
                risk_score: 5,
            })
        }
        async fn liquidity_depth(&self, mint: &str) -> AgentResult<LiquidityDepth> {
            Ok(LiquidityDepth {
                mint: mint.to_string(),
                liquidity_usd: Some(1_000_000.0),
                pool_count: Some(4),
                risk_score: 5,
            })
        }
    }

    struct StubQuoteApi;

    #[async_trait]
    impl QuoteApi for StubQuoteApi {
        async fn quote(&self, request: &QuoteRequest) -> AgentResult<QuoteResponse> {
            Ok(QuoteResponse {
                input_mint: request.input_mint.clone(),
                output_mint: request.output_mint.clone(),
                in_amount: request.amount,
                out_amount: request.amount * 2,
                out_amount_with_slippage: request.amount * 2 - 100,
                price_impact_pct: 0.05,
                route_plan: vec![RoutePlanStep {
                    venue: "Orca".to_string(),
                    input_mint: request.input_mint.clone(),
                    output_mint: request.output_mint.clone(),
                    in_amount: request.amount,
                    out_amount: request.amount * 2,
                    percent: 100,
                }],
            })
        }
    }

    #[derive(Default)]
    struct StubSigner {
        send_calls: AtomicU32,
        approval_calls: AtomicU32,
        fail_send: AtomicBool,
    }

    #[async_trait]
    impl SigningService for StubSigner {
        async fn sign_and_send(
            &self,
            _tx: &PreparedTransaction,
        ) -> AgentResult<SignAndSendResult> {
            self.send_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_send.load(Ordering::SeqCst) {
                return Err(AgentError::SendFailed("blockhash expired".to_string()));
            }
            Ok(SignAndSendResult {
                signature: "Sig111".to_string(),
                confirmed: false,
                error: None,
            })
        }
        async fn create_approval_request(
            &self,
            _description: &str,
            _estimated_fee_sol: f64,
            _risk: RiskLevel,
        ) -> AgentResult<String> {
            self.approval_calls.fetch_add(1, Ordering::SeqCst);
            Ok("approval-1".to_string())
        }
    }

    fn fast_config() -> AgentConfig {
        let mut config = AgentConfig::standard();
        config.tx.confirmation_poll_interval_ms = 1;
        config.tx.max_confirmation_polls = 5;
        config
    }

    fn coordinator_with(rpc: StubRpc, signer: Arc<StubSigner>) -> AgentCoordinator {
        AgentCoordinator::new(
            Arc::new(rpc),
            Arc::new(StubOracle),
            Arc::new(StubQuoteApi),
            signer,
            fast_config(),
        )
    }

    fn swap_request(require_approval: bool) -> StrategyRequest {
        StrategyRequest {
            wallet_address: Some("Wallet111".to_string()),
            input_mint: Some("MintA".to_string()),
            output_mint: Some("MintB".to_string()),
            amount: Some(1_000_000),
            require_approval,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn swap_without_approval_runs_to_success() {
        let signer = Arc::new(StubSigner::default());
        let coordinator = coordinator_with(StubRpc { units: 100_000, ..Default::default() }, signer.clone());

        let result = coordinator
            .execute_strategy("swap", swap_request(false))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.state, ExecutionState::Success);
        assert_eq!(signer.send_calls.load(Ordering::SeqCst), 1);

        let record = coordinator.get_status(&result.execution_id).await.unwrap();
        assert_eq!(record.transaction_signature.as_deref(), Some("Sig111"));
        assert_eq!(record.confirmation_status.as_deref(), Some("finalized"));
        assert_eq!(record.progress, 100);
        assert!(record
            .staged(crate::workers::builder::NAMESPACE, "quote")
            .is_some());
    }

    #[tokio::test]
    async fn swap_with_approval_parks_before_sending() {
        let signer = Arc::new(StubSigner::default());
        let coordinator = coordinator_with(StubRpc { units: 100_000, ..Default::default() }, signer.clone());

        let result = coordinator
            .execute_strategy("swap", swap_request(true))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.state, ExecutionState::ApprovalRequired);
        assert!(result.errors.is_empty());
        assert_eq!(signer.send_calls.load(Ordering::SeqCst), 0);
        assert_eq!(signer.approval_calls.load(Ordering::SeqCst), 1);

        // Approval resumes through sign, send and confirm
        let resumed = coordinator
            .approve_execution(&result.execution_id)
            .await
            .unwrap();
        assert!(resumed.success);
        assert_eq!(signer.send_calls.load(Ordering::SeqCst), 1);
        let record = coordinator.get_status(&result.execution_id).await.unwrap();
        assert!(record.approval_timestamp.is_some());
    }

    #[tokio::test]
    async fn concurrent_approvals_submit_exactly_once() {
        let signer = Arc::new(StubSigner::default());
        let coordinator = coordinator_with(StubRpc { units: 100_000, ..Default::default() }, signer.clone());
        let parked = coordinator
            .execute_strategy("swap", swap_request(true))
            .await
            .unwrap();

        // Both callers race for the same parked record; the claim is
        // a compare-and-set, so one wins and the other is refused
        let (a, b) = tokio::join!(
            coordinator.approve_execution(&parked.execution_id),
            coordinator.approve_execution(&parked.execution_id)
        );
        assert!(a.is_ok() ^ b.is_ok());
        assert_eq!(signer.send_calls.load(Ordering::SeqCst), 1);

        let record = coordinator.get_status(&parked.execution_id).await.unwrap();
        assert_eq!(record.state, ExecutionState::Success);
        // A late approval finds the record terminal
        assert!(coordinator
            .approve_execution(&parked.execution_id)
            .await
            .is_err());
    }

    /// Oracle that parks inside the price fetch until the test
    /// releases it, so a cancel can land mid-strategy
    struct GatedOracle {
        reached: Arc<tokio::sync::Notify>,
        release: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl TokenOracle for GatedOracle {
        async fn metadata(&self, mint: &str) -> AgentResult<TokenMetadata> {
            StubOracle.metadata(mint).await
        }
        async fn prices(
            &self,
            mints: &[String],
        ) -> AgentResult<HashMap<String, PriceInfo>> {
            self.reached.notify_one();
            self.release.notified().await;
            StubOracle.prices(mints).await
        }
        async fn holder_distribution(&self, mint: &str) -> AgentResult<HolderDistribution> {
            StubOracle.holder_distribution(mint).await
        }
        async fn liquidity_depth(&self, mint: &str) -> AgentResult<LiquidityDepth> {
            StubOracle.liquidity_depth(mint).await
        }
    }

    #[tokio::test]
    async fn pending_cancel_stops_at_the_next_step_boundary() {
        let reached = Arc::new(tokio::sync::Notify::new());
        let release = Arc::new(tokio::sync::Notify::new());
        let signer = Arc::new(StubSigner::default());
        let coordinator = Arc::new(AgentCoordinator::new(
            Arc::new(StubRpc::default()),
            Arc::new(GatedOracle {
                reached: reached.clone(),
                release: release.clone(),
            }),
            Arc::new(StubQuoteApi),
            signer.clone(),
            fast_config(),
        ));

        let runner = coordinator.clone();
        let handle = tokio::spawn(async move {
            runner
                .execute_strategy("swap", swap_request(false))
                .await
                .unwrap()
        });

        // Request the cancel while the price fetch is in flight
        reached.notified().await;
        let id = coordinator.get_history().await[0].id.clone();
        assert!(coordinator.cancel_execution(&id).await);
        release.notify_one();

        let result = handle.await.unwrap();
        assert!(!result.success);
        assert_eq!(result.state, ExecutionState::Cancelled);
        // Cancellation is not a failure; no error is recorded
        assert!(result.errors.is_empty());

        // The in-flight step completed and wrote, but nothing past
        // the boundary ran
        let record = coordinator.get_status(&id).await.unwrap();
        assert_eq!(record.state, ExecutionState::Cancelled);
        assert!(record
            .staged(crate::workers::lookup::NAMESPACE, "prices")
            .is_some());
        assert!(record
            .staged(crate::workers::builder::NAMESPACE, "quote")
            .is_none());
        assert_eq!(signer.send_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_execution_lands_in_cancelled() {
        let signer = Arc::new(StubSigner::default());
        let coordinator = coordinator_with(StubRpc { units: 100_000, ..Default::default() }, signer.clone());

        let result = coordinator
            .execute_strategy("swap", swap_request(true))
            .await
            .unwrap();
        let rejected = coordinator
            .reject_execution(&result.execution_id)
            .await
            .unwrap();

        assert_eq!(rejected.state, ExecutionState::Cancelled);
        assert_eq!(signer.send_calls.load(Ordering::SeqCst), 0);
        // Terminal: a second decision is refused
        assert!(coordinator
            .approve_execution(&result.execution_id)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn fee_ceiling_breach_never_reaches_execution() {
        let signer = Arc::new(StubSigner::default());
        // 120B units at 1000 micro-lamports/unit = 0.12 SOL priority fee
        let coordinator = coordinator_with(
            StubRpc {
                units: 120_000_000_000,
                ..Default::default()
            },
            signer.clone(),
        );

        let mut request = swap_request(false);
        request.fee_ceiling_sol = Some(0.1);
        let result = coordinator.execute_strategy("swap", request).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.state, ExecutionState::Failed);
        assert_eq!(result.errors[0].code, "fee_ceiling_exceeded");
        assert_eq!(signer.send_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_simulation_is_terminal() {
        let signer = Arc::new(StubSigner::default());
        let coordinator = coordinator_with(
            StubRpc {
                simulation_err: Some("InstructionError(0, Custom(1))".to_string()),
                units: 0,
            },
            signer.clone(),
        );

        let result = coordinator
            .execute_strategy("swap", swap_request(false))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.errors[0].code, "simulation_failure");
        assert_eq!(signer.send_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rebalance_parks_with_plan_and_approves_without_tx() {
        let signer = Arc::new(StubSigner::default());
        let coordinator = coordinator_with(StubRpc::default(), signer.clone());

        let mut targets = HashMap::new();
        targets.insert("MintA".to_string(), 50.0);
        targets.insert("MintB".to_string(), 50.0);
        let request = StrategyRequest {
            wallet_address: Some("Wallet111".to_string()),
            targets,
            ..Default::default()
        };

        let result = coordinator
            .execute_strategy("rebalance_portfolio", request)
            .await
            .unwrap();
        assert_eq!(result.state, ExecutionState::ApprovalRequired);

        let record = coordinator.get_status(&result.execution_id).await.unwrap();
        assert!(record
            .staged(crate::workers::builder::NAMESPACE, "rebalance_plan")
            .is_some());

        // No staged transaction, so approval completes immediately
        let approved = coordinator
            .approve_execution(&result.execution_id)
            .await
            .unwrap();
        assert!(approved.success);
        assert_eq!(signer.send_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn analyze_safety_stages_a_report() {
        let coordinator = coordinator_with(StubRpc::default(), Arc::new(StubSigner::default()));
        let request = StrategyRequest {
            mint: Some("MintA".to_string()),
            ..Default::default()
        };

        let result = coordinator
            .execute_strategy("analyze_safety", request)
            .await
            .unwrap();
        assert!(result.success);

        let record = coordinator.get_status(&result.execution_id).await.unwrap();
        let report = record
            .staged(crate::workers::analysis::NAMESPACE, "safety_report")
            .unwrap();
        assert_eq!(report["score"], 0);
        assert_eq!(report["verdict"], "safe");
    }

    #[tokio::test]
    async fn dca_schedule_is_the_staged_artifact() {
        let coordinator = coordinator_with(StubRpc::default(), Arc::new(StubSigner::default()));
        let request = StrategyRequest {
            input_mint: Some("MintA".to_string()),
            output_mint: Some("MintB".to_string()),
            dca_total_amount: Some(100.0),
            dca_interval: Some("daily".to_string()),
            dca_iterations: Some(4),
            ..Default::default()
        };

        let result = coordinator
            .execute_strategy("execute_dca", request)
            .await
            .unwrap();
        assert!(result.success);

        let record = coordinator.get_status(&result.execution_id).await.unwrap();
        let schedule = record
            .staged(crate::workers::builder::NAMESPACE, "dca_schedule")
            .unwrap();
        assert_eq!(schedule["entries"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn optimize_fees_recommends_without_sending() {
        let signer = Arc::new(StubSigner::default());
        let coordinator = coordinator_with(StubRpc { units: 150_000, ..Default::default() }, signer.clone());
        let request = StrategyRequest {
            wallet_address: Some("Wallet111".to_string()),
            instructions: vec![InstructionStep {
                index: 0,
                venue: "Orca".to_string(),
                description: "swap".to_string(),
                input_mint: "MintA".to_string(),
                output_mint: "MintB".to_string(),
                in_amount: 1,
                out_amount: 2,
            }],
            ..Default::default()
        };

        let result = coordinator
            .execute_strategy("optimize_fees", request)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(signer.send_calls.load(Ordering::SeqCst), 0);

        let record = coordinator.get_status(&result.execution_id).await.unwrap();
        assert!(record
            .staged(crate::workers::transaction::NAMESPACE, "fee_recommendation")
            .is_some());
    }

    #[tokio::test]
    async fn unknown_action_in_custom_strategy_fails_the_record() {
        let coordinator = coordinator_with(StubRpc::default(), Arc::new(StubSigner::default()));
        let request = StrategyRequest {
            actions: vec!["summon_liquidity".to_string()],
            ..Default::default()
        };

        let result = coordinator.execute_strategy("custom", request).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.errors[0].code, "unknown_action");
    }

    #[tokio::test]
    async fn custom_actions_stage_their_outputs() {
        let coordinator = coordinator_with(StubRpc::default(), Arc::new(StubSigner::default()));
        let request = StrategyRequest {
            wallet_address: Some("Wallet111".to_string()),
            mints: vec!["MintA".to_string()],
            actions: vec!["fetch_holdings".to_string(), "fetch_prices".to_string()],
            ..Default::default()
        };

        let result = coordinator.execute_strategy("custom", request).await.unwrap();
        assert!(result.success);

        let record = coordinator.get_status(&result.execution_id).await.unwrap();
        assert!(record
            .staged(crate::workers::lookup::NAMESPACE, "fetch_holdings")
            .is_some());
        assert!(record
            .staged(crate::workers::lookup::NAMESPACE, "fetch_prices")
            .is_some());
    }

    #[tokio::test]
    async fn custom_action_outputs_land_in_their_producer_namespace() {
        let coordinator = coordinator_with(StubRpc::default(), Arc::new(StubSigner::default()));
        let start = Utc::now();
        let request = StrategyRequest {
            wallet_address: Some("Wallet111".to_string()),
            mint: Some("MintA".to_string()),
            price_history: vec![
                PricePoint {
                    timestamp: start,
                    price: 100.0,
                },
                PricePoint {
                    timestamp: start + chrono::Duration::minutes(1),
                    price: 110.0,
                },
            ],
            actions: vec![
                "analyze_trend".to_string(),
                "find_harvest_candidates".to_string(),
            ],
            ..Default::default()
        };

        let result = coordinator.execute_strategy("custom", request).await.unwrap();
        assert!(result.success);

        let record = coordinator.get_status(&result.execution_id).await.unwrap();
        assert!(record
            .staged(crate::workers::analysis::NAMESPACE, "analyze_trend")
            .is_some());
        assert!(record
            .staged(crate::workers::builder::NAMESPACE, "find_harvest_candidates")
            .is_some());
        assert!(record
            .staged(crate::workers::lookup::NAMESPACE, "analyze_trend")
            .is_none());
    }

    #[tokio::test]
    async fn custom_strategy_progress_survives_many_actions() {
        let coordinator = coordinator_with(StubRpc::default(), Arc::new(StubSigner::default()));
        let request = StrategyRequest {
            mints: vec!["MintA".to_string()],
            actions: vec!["fetch_prices".to_string(); 300],
            ..Default::default()
        };

        let result = coordinator.execute_strategy("custom", request).await.unwrap();
        assert!(result.success);

        let record = coordinator.get_status(&result.execution_id).await.unwrap();
        assert_eq!(record.progress, 100);
        assert_eq!(record.steps.len(), 300);
    }

    #[tokio::test]
    async fn unknown_strategy_is_rejected_before_any_record() {
        let coordinator = coordinator_with(StubRpc::default(), Arc::new(StubSigner::default()));
        let result = coordinator
            .execute_strategy("yolo_trade", StrategyRequest::default())
            .await;
        assert!(matches!(result, Err(AgentError::UnknownStrategy(_))));
        assert!(coordinator.get_history().await.is_empty());
    }

    #[tokio::test]
    async fn archive_refuses_active_records_and_drops_terminal_ones() {
        let coordinator = coordinator_with(StubRpc::default(), Arc::new(StubSigner::default()));
        let parked = coordinator
            .execute_strategy("swap", swap_request(true))
            .await
            .unwrap();
        assert!(coordinator.archive_execution(&parked.execution_id).await.is_err());

        let done = coordinator
            .execute_strategy("swap", swap_request(false))
            .await
            .unwrap();
        let archived = coordinator
            .archive_execution(&done.execution_id)
            .await
            .unwrap();
        assert_eq!(archived.state, ExecutionState::Success);
        assert!(coordinator.get_status(&done.execution_id).await.is_none());
    }

    #[tokio::test]
    async fn cancel_is_refused_for_terminal_records() {
        let coordinator = coordinator_with(StubRpc::default(), Arc::new(StubSigner::default()));
        let done = coordinator
            .execute_strategy("swap", swap_request(false))
            .await
            .unwrap();
        assert!(!coordinator.cancel_execution(&done.execution_id).await);
        assert!(!coordinator.cancel_execution("nonexistent").await);
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let coordinator = coordinator_with(StubRpc::default(), Arc::new(StubSigner::default()));
        let first = coordinator
            .execute_strategy("swap", swap_request(false))
            .await
            .unwrap();
        let second = coordinator
            .execute_strategy("swap", swap_request(false))
            .await
            .unwrap();

        let history = coordinator.get_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.execution_id);
        assert_eq!(history[1].id, first.execution_id);
    }
}
