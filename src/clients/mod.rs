/// External collaborator contracts
///
/// The framework consumes four narrow capabilities: an RPC endpoint,
/// a quote/route API, a token metadata/price oracle and a signing
/// service. Each is a trait so host applications plug in their own
/// transports; `jupiter.rs` ships the one concrete adapter.

pub mod jupiter;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AgentResult;

/// Wrapped SOL mint address
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64) as u64
}

/// Token metadata as returned by the oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub verified: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub upgrade_authority: Option<String>,
    pub freeze_authority: Option<String>,
}

impl TokenMetadata {
    /// Degraded-but-valid placeholder used when a metadata fetch
    /// fails. Metadata lookups are best-effort and never block a
    /// strategy.
    pub fn placeholder(mint: &str) -> Self {
        Self {
            mint: mint.to_string(),
            symbol: "???".to_string(),
            name: "Unknown Token".to_string(),
            decimals: 9,
            verified: false,
            created_at: None,
            upgrade_authority: None,
            freeze_authority: None,
        }
    }
}

/// Price point for one token
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceInfo {
    pub price_usd: f64,
    pub change_24h_pct: f64,
}

/// One token position held by a wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenHolding {
    pub mint: String,
    pub amount: f64,
    pub decimals: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Concentration {
    Low,
    Medium,
    High,
    Unknown,
}

/// Holder distribution analytics; `risk_score` is 0-100
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderDistribution {
    pub mint: String,
    pub top_holder_pct: Option<f64>,
    pub holder_count: Option<u64>,
    pub concentration: Concentration,
    pub risk_score: u8,
}

impl HolderDistribution {
    /// Conservative result when the analytics source is unreachable
    pub fn unknown(mint: &str) -> Self {
        Self {
            mint: mint.to_string(),
            top_holder_pct: None,
            holder_count: None,
            concentration: Concentration::Unknown,
            risk_score: 50,
        }
    }
}

/// Liquidity analytics; `liquidity_usd` is None when unknown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidityDepth {
    pub mint: String,
    pub liquidity_usd: Option<f64>,
    pub pool_count: Option<u32>,
    pub risk_score: u8,
}

impl LiquidityDepth {
    pub fn unknown(mint: &str) -> Self {
        Self {
            mint: mint.to_string(),
            liquidity_usd: None,
            pool_count: None,
            risk_score: 50,
        }
    }
}

/// Quote request for an ordered pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
    pub slippage_bps: u16,
}

/// One hop of a venue-attributed route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlanStep {
    pub venue: String,
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
    pub percent: u8,
}

/// Normalized quote shared by every quote backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
    pub out_amount_with_slippage: u64,
    pub price_impact_pct: f64,
    pub route_plan: Vec<RoutePlanStep>,
}

/// Instruction descriptor produced by the builder worker.
/// The payload stays opaque to this crate; descriptors only carry
/// enough structure for assembly, display and approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionStep {
    pub index: usize,
    pub venue: String,
    pub description: String,
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: u64,
    pub out_amount: u64,
}

/// A transaction ready for simulation and signing. The payload is an
/// opaque signable blob as far as this crate is concerned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedTransaction {
    pub payload: String,
    pub blockhash: String,
    pub fee_payer: String,
    pub instruction_count: usize,
}

/// Result of a dry-run simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub err: Option<String>,
    pub units_consumed: Option<u64>,
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLevel {
    Processed,
    Confirmed,
    Finalized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignAndSendResult {
    pub signature: String,
    pub confirmed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Blockchain RPC primitives
#[async_trait]
pub trait RpcInterface: Send + Sync {
    async fn get_balance(&self, address: &str) -> AgentResult<u64>;

    async fn get_latest_blockhash(&self) -> AgentResult<String>;

    async fn simulate_transaction(
        &self,
        tx: &PreparedTransaction,
    ) -> AgentResult<SimulationOutcome>;

    async fn send_transaction(&self, tx: &PreparedTransaction) -> AgentResult<String>;

    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> AgentResult<Option<ConfirmationLevel>>;

    /// Enumerate token-account records for an owner address
    async fn get_token_accounts(&self, owner: &str) -> AgentResult<Vec<TokenHolding>>;
}

/// Quote/route API for an asset pair
#[async_trait]
pub trait QuoteApi: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> AgentResult<QuoteResponse>;
}

/// Token metadata, prices and analytics
#[async_trait]
pub trait TokenOracle: Send + Sync {
    async fn metadata(&self, mint: &str) -> AgentResult<TokenMetadata>;

    async fn prices(&self, mints: &[String]) -> AgentResult<HashMap<String, PriceInfo>>;

    async fn holder_distribution(&self, mint: &str) -> AgentResult<HolderDistribution>;

    async fn liquidity_depth(&self, mint: &str) -> AgentResult<LiquidityDepth>;
}

/// Wallet capability that signs and submits a prepared transaction
#[async_trait]
pub trait SigningService: Send + Sync {
    async fn sign_and_send(&self, tx: &PreparedTransaction) -> AgentResult<SignAndSendResult>;

    async fn create_approval_request(
        &self,
        description: &str,
        estimated_fee_sol: f64,
        risk: RiskLevel,
    ) -> AgentResult<String>;
}
