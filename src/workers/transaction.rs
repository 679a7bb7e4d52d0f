/// Transaction worker - prepare, simulate, gate, submit, confirm
///
/// Every transaction passes the same pipeline: assembly against a
/// fresh blockhash, dry-run simulation, a fee-ceiling check, an
/// optional approval gate, then submission and confirmation polling.
/// A failed simulation or a breached ceiling is terminal, never
/// retried.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clients::{
    lamports_to_sol, ConfirmationLevel, InstructionStep, PreparedTransaction, RiskLevel,
    RpcInterface, SignAndSendResult, SigningService, SimulationOutcome,
};
use crate::config::{AgentConfig, TransactionConfig, WorkerConfig};
use crate::errors::{AgentError, AgentResult};
use crate::execution::StrategyKind;
use crate::logger::{self, LogTag};

pub const NAMESPACE: &str = "transaction";

/// Fee estimate derived from simulation compute usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub base_fee_lamports: u64,
    pub priority_fee_lamports: u64,
    pub total_fee_sol: f64,
    pub units_consumed: u64,
}

/// Simulation plus fee outcome staged for the approval gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub outcome: SimulationOutcome,
    pub fee: FeeEstimate,
    pub risk: RiskLevel,
}

pub struct TransactionWorker {
    rpc: Arc<dyn RpcInterface>,
    signer: Arc<dyn SigningService>,
    config: WorkerConfig,
    tx_config: TransactionConfig,
}

impl TransactionWorker {
    pub const NAME: &'static str = "transaction";

    pub fn new(
        rpc: Arc<dyn RpcInterface>,
        signer: Arc<dyn SigningService>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            rpc,
            signer,
            config: config.transaction.clone(),
            tx_config: config.tx.clone(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Envelope for the confirmation step: the step timeout must
    /// outlast the full polling window, and polling is not retried
    /// as a unit (each poll already tolerates a missing status).
    pub fn confirmation_config(&self) -> WorkerConfig {
        let window_ms = self.tx_config.max_confirmation_polls as u64
            * self.tx_config.confirmation_poll_interval_ms;
        WorkerConfig {
            timeout_ms: window_ms + self.config.timeout_ms,
            max_retries: 0,
            ..self.config.clone()
        }
    }

    /// Assemble a signable transaction from instruction descriptors
    /// against a fresh blockhash
    pub async fn prepare(
        &self,
        instructions: &[InstructionStep],
        fee_payer: &str,
    ) -> AgentResult<PreparedTransaction> {
        if instructions.is_empty() {
            return Err(AgentError::Validation(
                "Cannot prepare a transaction with no instructions".to_string(),
            ));
        }
        if fee_payer.is_empty() {
            return Err(AgentError::Validation(
                "Fee payer address cannot be empty".to_string(),
            ));
        }

        let blockhash = self.rpc.get_latest_blockhash().await?;
        let payload = serde_json::to_string(instructions)?;

        logger::debug(
            LogTag::Transaction,
            "TX_PREPARED",
            &format!(
                "instructions={} blockhash={} fee_payer={}",
                instructions.len(),
                blockhash,
                fee_payer
            ),
        );

        Ok(PreparedTransaction {
            payload,
            blockhash,
            fee_payer: fee_payer.to_string(),
            instruction_count: instructions.len(),
        })
    }

    /// Dry-run the transaction. A simulation error is terminal: the
    /// same payload would fail on-chain identically, so there is
    /// nothing to retry.
    pub async fn simulate(&self, tx: &PreparedTransaction) -> AgentResult<SimulationOutcome> {
        let outcome = self.rpc.simulate_transaction(tx).await?;
        if let Some(err) = &outcome.err {
            logger::error(
                LogTag::Transaction,
                "SIMULATION_FAILED",
                &format!("error={} logs={}", err, outcome.logs.len()),
            );
            return Err(AgentError::SimulationFailed(err.clone()));
        }
        Ok(outcome)
    }

    /// Total fee in SOL: base signature fee plus priority fee priced
    /// per simulated compute unit
    pub fn estimate_fee(&self, outcome: &SimulationOutcome) -> FeeEstimate {
        let units = outcome.units_consumed.unwrap_or(0);
        let priority_fee_lamports =
            (units as f64 * self.tx_config.cu_price_micro_lamports as f64 / 1_000_000.0) as u64;
        let total_lamports = self.tx_config.base_fee_lamports + priority_fee_lamports;
        FeeEstimate {
            base_fee_lamports: self.tx_config.base_fee_lamports,
            priority_fee_lamports,
            total_fee_sol: lamports_to_sol(total_lamports),
            units_consumed: units,
        }
    }

    /// Fee-ceiling gate. A breach is terminal and fires before any
    /// approval or submission step.
    pub fn check_fee_ceiling(
        &self,
        fee: &FeeEstimate,
        ceiling_sol: Option<f64>,
    ) -> AgentResult<()> {
        let ceiling = ceiling_sol.unwrap_or(self.tx_config.default_fee_ceiling_sol);
        if fee.total_fee_sol > ceiling {
            return Err(AgentError::FeeCeilingExceeded {
                estimated_sol: fee.total_fee_sol,
                ceiling_sol: ceiling,
            });
        }
        Ok(())
    }

    /// Risk label shown at the approval gate. Anything over 0.1 SOL
    /// in fees is high; portfolio-wide strategies and mid-range fees
    /// are medium.
    pub fn risk_label(&self, fee: &FeeEstimate, strategy: StrategyKind) -> RiskLevel {
        if fee.total_fee_sol > 0.1 {
            RiskLevel::High
        } else if fee.total_fee_sol > 0.05
            || matches!(
                strategy,
                StrategyKind::RebalancePortfolio | StrategyKind::OptimizeFees
            )
        {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Register an approval request with the signing service and
    /// return its id; the execution parks at approval_required until
    /// the operator decides
    pub async fn request_approval(
        &self,
        description: &str,
        fee: &FeeEstimate,
        risk: RiskLevel,
    ) -> AgentResult<String> {
        let approval_id = self
            .signer
            .create_approval_request(description, fee.total_fee_sol, risk)
            .await?;
        logger::info(
            LogTag::Transaction,
            "APPROVAL_REQUESTED",
            &format!(
                "id={} fee_sol={:.6} risk={}",
                approval_id,
                fee.total_fee_sol,
                risk.as_str()
            ),
        );
        Ok(approval_id)
    }

    pub async fn sign_and_send(&self, tx: &PreparedTransaction) -> AgentResult<SignAndSendResult> {
        let result = self.signer.sign_and_send(tx).await?;
        if let Some(err) = &result.error {
            return Err(AgentError::SendFailed(err.clone()));
        }
        logger::info(
            LogTag::Transaction,
            "TX_SENT",
            &format!("signature={}", result.signature),
        );
        Ok(result)
    }

    /// Poll signature status until the network reports confirmed or
    /// finalized, up to the configured poll budget. Run this under
    /// `confirmation_config()` so the step timeout outlasts the full
    /// polling window.
    pub async fn await_confirmation(&self, signature: &str) -> AgentResult<ConfirmationLevel> {
        let interval =
            std::time::Duration::from_millis(self.tx_config.confirmation_poll_interval_ms);

        for poll in 1..=self.tx_config.max_confirmation_polls {
            match self.rpc.get_signature_status(signature).await? {
                Some(level @ (ConfirmationLevel::Confirmed | ConfirmationLevel::Finalized)) => {
                    logger::info(
                        LogTag::Transaction,
                        "TX_CONFIRMED",
                        &format!("signature={} polls={} level={:?}", signature, poll, level),
                    );
                    return Ok(level);
                }
                Some(ConfirmationLevel::Processed) | None => {
                    logger::verbose(
                        LogTag::Transaction,
                        "CONFIRM_POLL",
                        &format!(
                            "signature={} poll={}/{}",
                            signature, poll, self.tx_config.max_confirmation_polls
                        ),
                    );
                }
            }
            if poll < self.tx_config.max_confirmation_polls {
                tokio::time::sleep(interval).await;
            }
        }

        Err(AgentError::ConfirmationTimeout {
            signature: signature.to_string(),
            polls: self.tx_config.max_confirmation_polls,
        })
    }
}
