/// Builder worker - assembles actionable artifacts
///
/// Quotes (cached), swap instruction lists, rebalance plans, DCA
/// schedules and harvest candidates. Quote routing is the only I/O
/// here; everything else is deterministic plan math.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::TtlCache;
use crate::clients::{
    InstructionStep, PriceInfo, QuoteApi, QuoteRequest, QuoteResponse, TokenHolding,
};
use crate::config::{AgentConfig, WorkerConfig};
use crate::errors::{AgentError, AgentResult};
use crate::logger::{self, LogTag};

pub const NAMESPACE: &str = "builder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceSide {
    Buy,
    Sell,
}

/// One adjustment in a rebalance plan, sized in USD off total
/// portfolio value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceAction {
    pub mint: String,
    pub side: RebalanceSide,
    pub current_pct: f64,
    pub target_pct: f64,
    pub delta_pct: f64,
    pub value_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancePlan {
    pub total_value_usd: f64,
    pub tolerance_pct: f64,
    pub actions: Vec<RebalanceAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DcaInterval {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl DcaInterval {
    pub fn parse(raw: &str) -> AgentResult<Self> {
        match raw {
            "hourly" => Ok(DcaInterval::Hourly),
            "daily" => Ok(DcaInterval::Daily),
            "weekly" => Ok(DcaInterval::Weekly),
            "monthly" => Ok(DcaInterval::Monthly),
            other => Err(AgentError::Validation(format!(
                "Unknown DCA interval: {}",
                other
            ))),
        }
    }

    /// Fixed spacing; months are 30 days flat
    pub fn spacing(&self) -> ChronoDuration {
        match self {
            DcaInterval::Hourly => ChronoDuration::hours(1),
            DcaInterval::Daily => ChronoDuration::days(1),
            DcaInterval::Weekly => ChronoDuration::weeks(1),
            DcaInterval::Monthly => ChronoDuration::days(30),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaEntry {
    pub iteration: u32,
    pub scheduled_at: DateTime<Utc>,
    pub amount: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcaSchedule {
    pub input_mint: String,
    pub output_mint: String,
    pub interval: DcaInterval,
    pub total_amount: f64,
    pub entries: Vec<DcaEntry>,
}

/// Loss position eligible for tax-loss harvesting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestCandidate {
    pub mint: String,
    pub amount: f64,
    pub cost_basis_usd: f64,
    pub current_value_usd: f64,
    pub unrealized_loss_usd: f64,
    pub estimated_tax_benefit_usd: f64,
}

pub struct BuilderWorker {
    quote_api: Arc<dyn QuoteApi>,
    config: WorkerConfig,
    quote_cache: TtlCache<QuoteRequest, QuoteResponse>,
    rebalance_tolerance_pct: f64,
    tax_rate: f64,
}

impl BuilderWorker {
    pub const NAME: &'static str = "builder";

    pub fn new(quote_api: Arc<dyn QuoteApi>, config: &AgentConfig) -> Self {
        Self {
            quote_api,
            config: config.builder.clone(),
            quote_cache: TtlCache::new(
                Duration::from_secs(config.cache.quote_ttl_secs),
                config.cache.capacity,
            ),
            rebalance_tolerance_pct: config.rebalance_tolerance_pct,
            tax_rate: config.tax_rate,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Fetch a route quote, served from the short-TTL cache when the
    /// identical request was quoted recently
    pub async fn route_quote(&self, request: &QuoteRequest) -> AgentResult<QuoteResponse> {
        if request.amount == 0 {
            return Err(AgentError::Validation(
                "Quote amount must be positive".to_string(),
            ));
        }
        if request.input_mint == request.output_mint {
            return Err(AgentError::Validation(
                "Input and output mint must differ".to_string(),
            ));
        }

        if let Some(hit) = self.quote_cache.get(request) {
            logger::debug(
                LogTag::Builder,
                "QUOTE_CACHE_HIT",
                &format!("pair={}->{}", request.input_mint, request.output_mint),
            );
            return Ok(hit);
        }

        let quote = self.quote_api.quote(request).await?;
        self.quote_cache.insert(request.clone(), quote.clone());
        Ok(quote)
    }

    /// Expand a quote's route plan into one instruction descriptor
    /// per hop, preserving venue attribution and hop order
    pub fn build_swap_instructions(&self, quote: &QuoteResponse) -> AgentResult<Vec<InstructionStep>> {
        if quote.route_plan.is_empty() {
            return Err(AgentError::Validation(
                "Quote carries an empty route plan".to_string(),
            ));
        }

        Ok(quote
            .route_plan
            .iter()
            .enumerate()
            .map(|(index, hop)| InstructionStep {
                index,
                venue: hop.venue.clone(),
                description: format!(
                    "swap {} -> {} via {} ({}%)",
                    hop.input_mint, hop.output_mint, hop.venue, hop.percent
                ),
                input_mint: hop.input_mint.clone(),
                output_mint: hop.output_mint.clone(),
                in_amount: hop.in_amount,
                out_amount: hop.out_amount,
            })
            .collect())
    }

    /// Rebalance plan: one action per asset whose allocation drifts
    /// past the tolerance band, sized in USD off total portfolio
    /// value. Assets within tolerance produce no action at all.
    pub fn build_rebalance_plan(
        &self,
        holdings: &[TokenHolding],
        prices: &HashMap<String, PriceInfo>,
        targets: &HashMap<String, f64>,
    ) -> AgentResult<RebalancePlan> {
        if holdings.is_empty() {
            return Err(AgentError::Validation(
                "Rebalance needs at least one holding".to_string(),
            ));
        }
        let target_sum: f64 = targets.values().sum();
        if (target_sum - 100.0).abs() > 0.01 {
            return Err(AgentError::Validation(format!(
                "Target allocations sum to {:.2}%, expected 100%",
                target_sum
            )));
        }

        let mut values: HashMap<String, f64> = HashMap::new();
        let mut total_value = 0.0;
        for holding in holdings {
            let price = prices.get(&holding.mint).map(|p| p.price_usd).unwrap_or(0.0);
            let value = holding.amount * price;
            total_value += value;
            values.insert(holding.mint.clone(), value);
        }
        if total_value <= 0.0 {
            return Err(AgentError::Validation(
                "Portfolio has no priced value to rebalance".to_string(),
            ));
        }

        let mut actions: Vec<RebalanceAction> = Vec::new();
        for (mint, target_pct) in targets {
            let current_pct = values.get(mint).copied().unwrap_or(0.0) / total_value * 100.0;
            let delta_pct = target_pct - current_pct;
            if delta_pct.abs() <= self.rebalance_tolerance_pct {
                continue;
            }
            let side = if delta_pct > 0.0 {
                RebalanceSide::Buy
            } else {
                RebalanceSide::Sell
            };
            actions.push(RebalanceAction {
                mint: mint.clone(),
                side,
                current_pct,
                target_pct: *target_pct,
                delta_pct,
                value_usd: total_value * delta_pct.abs() / 100.0,
            });
        }
        // Sells first so proceeds fund the buys
        actions.sort_by(|a, b| {
            (a.side == RebalanceSide::Buy)
                .cmp(&(b.side == RebalanceSide::Buy))
                .then(a.mint.cmp(&b.mint))
        });

        logger::info(
            LogTag::Builder,
            "REBALANCE_PLAN",
            &format!(
                "total_usd={:.2} actions={} tolerance={}%",
                total_value,
                actions.len(),
                self.rebalance_tolerance_pct
            ),
        );

        Ok(RebalancePlan {
            total_value_usd: total_value,
            tolerance_pct: self.rebalance_tolerance_pct,
            actions,
        })
    }

    /// Evenly split DCA schedule with strictly increasing timestamps,
    /// first entry one interval out
    pub fn build_dca_schedule(
        &self,
        input_mint: &str,
        output_mint: &str,
        total_amount: f64,
        interval: DcaInterval,
        iterations: u32,
        start: DateTime<Utc>,
    ) -> AgentResult<DcaSchedule> {
        if iterations == 0 {
            return Err(AgentError::Validation(
                "DCA needs at least one iteration".to_string(),
            ));
        }
        if total_amount <= 0.0 {
            return Err(AgentError::Validation(
                "DCA total amount must be positive".to_string(),
            ));
        }

        let per_iteration = total_amount / iterations as f64;
        let spacing = interval.spacing();
        let entries = (1..=iterations)
            .map(|i| DcaEntry {
                iteration: i,
                scheduled_at: start + spacing * i as i32,
                amount: per_iteration,
                status: "pending".to_string(),
            })
            .collect();

        Ok(DcaSchedule {
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            interval,
            total_amount,
            entries,
        })
    }

    /// Loss positions sized for full exit, with the tax benefit
    /// estimated at the configured rate
    pub fn find_harvest_candidates(
        &self,
        holdings: &[TokenHolding],
        prices: &HashMap<String, PriceInfo>,
        cost_basis: &HashMap<String, f64>,
    ) -> Vec<HarvestCandidate> {
        let mut candidates: Vec<HarvestCandidate> = holdings
            .iter()
            .filter_map(|holding| {
                let basis = *cost_basis.get(&holding.mint)?;
                let price = prices.get(&holding.mint).map(|p| p.price_usd)?;
                let current_value = holding.amount * price;
                let loss = basis - current_value;
                if loss <= 0.0 {
                    return None;
                }
                Some(HarvestCandidate {
                    mint: holding.mint.clone(),
                    amount: holding.amount,
                    cost_basis_usd: basis,
                    current_value_usd: current_value,
                    unrealized_loss_usd: loss,
                    estimated_tax_benefit_usd: loss * self.tax_rate,
                })
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.unrealized_loss_usd
                .partial_cmp(&a.unrealized_loss_usd)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates
    }

    pub fn quote_cache_metrics(&self) -> crate::cache::CacheMetrics {
        self.quote_cache.metrics()
    }
}
