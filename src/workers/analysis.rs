/// Analysis worker - pure computation over lookup results
///
/// No I/O happens here. Safety scoring, MEV-pattern classification,
/// trend/volatility analysis and portfolio risk aggregation all
/// operate on data the lookup worker staged earlier in the record.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clients::{
    Concentration, HolderDistribution, LiquidityDepth, PriceInfo, RiskLevel, TokenHolding,
    TokenMetadata, SOL_MINT,
};
use crate::config::{AgentConfig, WorkerConfig};
use crate::errors::{AgentError, AgentResult};

pub const NAMESPACE: &str = "analysis";

/// Score weights: additive and capped so no single check can push a
/// token past the high-risk threshold without corroborating signals.
const FAIL_WEIGHT: u32 = 30;
const WARNING_WEIGHT: u32 = 10;
const HIGH_FLAG_WEIGHT: u32 = 20;
const MEDIUM_FLAG_WEIGHT: u32 = 10;

/// Verdict thresholds on the 0-100 score
const SAFE_BELOW: u32 = 30;
const WARNING_BELOW: u32 = 60;

/// Trend classification band in percent
const TREND_BAND_PCT: f64 = 5.0;

/// Liquidity floors in USD
const LIQUIDITY_FAIL_FLOOR: f64 = 1_000.0;
const LIQUIDITY_WARN_FLOOR: f64 = 10_000.0;

/// Holder concentration thresholds (top holder share, percent)
const CONCENTRATION_FAIL_PCT: f64 = 50.0;
const CONCENTRATION_WARN_PCT: f64 = 25.0;

/// Minimum token age thresholds in hours
const AGE_FAIL_HOURS: i64 = 24;
const AGE_WARN_HOURS: i64 = 72;

/// Well-known stable/major mints treated as low risk
const MAJOR_MINTS: [&str; 3] = [
    SOL_MINT,
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", // USDC
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", // USDT
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagSeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyCheck {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyFlag {
    pub severity: FlagSeverity,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyVerdict {
    Safe,
    Warning,
    HighRisk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyReport {
    pub mint: String,
    pub score: u32,
    pub verdict: SafetyVerdict,
    pub checks: Vec<SafetyCheck>,
    pub flags: Vec<SafetyFlag>,
}

/// MEV candidate as supplied by the caller; `tx_type` is the
/// discriminator already present on the transaction record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MevCandidate {
    pub id: String,
    pub tx_type: String,
    pub estimated_profit_sol: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MevCategory {
    Arbitrage,
    Sandwich,
    Liquidation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MevOpportunity {
    pub candidate_id: String,
    pub category: MevCategory,
    pub estimated_profit_sol: f64,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub mint: String,
    pub trend: TrendDirection,
    pub change_pct: f64,
    pub volatility: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRisk {
    pub mint: String,
    pub value_usd: f64,
    pub category: RiskCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRiskReport {
    pub total_value_usd: f64,
    pub risk_pct: f64,
    pub level: RiskLevel,
    pub positions: Vec<PositionRisk>,
}

pub struct AnalysisWorker {
    config: WorkerConfig,
    dust_threshold_usd: f64,
}

impl AnalysisWorker {
    pub const NAME: &'static str = "analysis";

    pub fn new(config: &AgentConfig) -> Self {
        Self {
            config: config.analysis.clone(),
            dust_threshold_usd: config.dust_threshold_usd,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Token safety score over six independent checks. Weights are
    /// additive and clamped to [0, 100]; six passes with zero flags
    /// score 0 and read as safe.
    pub fn token_safety_score(
        &self,
        metadata: &TokenMetadata,
        holders: &HolderDistribution,
        liquidity: &LiquidityDepth,
        now: DateTime<Utc>,
    ) -> SafetyReport {
        let mut checks: Vec<SafetyCheck> = Vec::with_capacity(6);
        let mut flags: Vec<SafetyFlag> = Vec::new();

        // 1. Metadata verification
        if metadata.verified {
            checks.push(check("metadata_verified", CheckStatus::Pass, "verified listing"));
        } else {
            checks.push(check(
                "metadata_verified",
                CheckStatus::Warning,
                "token metadata is unverified",
            ));
            flags.push(flag(FlagSeverity::Medium, "unverified_metadata"));
        }

        // 2. Holder concentration
        match holders.top_holder_pct {
            Some(pct) if pct > CONCENTRATION_FAIL_PCT => {
                checks.push(check(
                    "holder_concentration",
                    CheckStatus::Fail,
                    &format!("top holder controls {:.1}% of supply", pct),
                ));
                flags.push(flag(FlagSeverity::High, "concentrated_supply"));
            }
            Some(pct) if pct > CONCENTRATION_WARN_PCT => {
                checks.push(check(
                    "holder_concentration",
                    CheckStatus::Warning,
                    &format!("top holder controls {:.1}% of supply", pct),
                ));
            }
            Some(_) => {
                checks.push(check("holder_concentration", CheckStatus::Pass, "distributed supply"));
            }
            None => {
                // Unknown analytics: conservative warning, never a fail
                checks.push(check(
                    "holder_concentration",
                    CheckStatus::Warning,
                    "holder distribution unknown",
                ));
            }
        }
        if holders.concentration == Concentration::High {
            // Corroborating signal from the analytics source itself
            if !flags.iter().any(|f| f.label == "concentrated_supply") {
                flags.push(flag(FlagSeverity::Medium, "high_concentration_reported"));
            }
        }

        // 3. Liquidity floor
        match liquidity.liquidity_usd {
            Some(usd) if usd < LIQUIDITY_FAIL_FLOOR => {
                checks.push(check(
                    "liquidity_floor",
                    CheckStatus::Fail,
                    &format!("liquidity ${:.0} below floor", usd),
                ));
                flags.push(flag(FlagSeverity::High, "thin_liquidity"));
            }
            Some(usd) if usd < LIQUIDITY_WARN_FLOOR => {
                checks.push(check(
                    "liquidity_floor",
                    CheckStatus::Warning,
                    &format!("liquidity ${:.0} is shallow", usd),
                ));
            }
            Some(_) => {
                checks.push(check("liquidity_floor", CheckStatus::Pass, "adequate liquidity"));
            }
            None => {
                checks.push(check(
                    "liquidity_floor",
                    CheckStatus::Warning,
                    "liquidity unknown",
                ));
            }
        }

        // 4. Minimum age
        match metadata.created_at {
            Some(created) => {
                let age_hours = (now - created).num_hours();
                if age_hours < AGE_FAIL_HOURS {
                    checks.push(check(
                        "minimum_age",
                        CheckStatus::Fail,
                        &format!("token is {}h old", age_hours),
                    ));
                    flags.push(flag(FlagSeverity::Medium, "freshly_minted"));
                } else if age_hours < AGE_WARN_HOURS {
                    checks.push(check(
                        "minimum_age",
                        CheckStatus::Warning,
                        &format!("token is {}h old", age_hours),
                    ));
                } else {
                    checks.push(check("minimum_age", CheckStatus::Pass, "established token"));
                }
            }
            None => {
                checks.push(check("minimum_age", CheckStatus::Warning, "age unknown"));
            }
        }

        // 5. Upgrade authority absence
        if let Some(authority) = &metadata.upgrade_authority {
            checks.push(check(
                "upgrade_authority",
                CheckStatus::Fail,
                &format!("upgrade authority present: {}", authority),
            ));
            flags.push(flag(FlagSeverity::High, "mutable_program"));
        } else {
            checks.push(check("upgrade_authority", CheckStatus::Pass, "no upgrade authority"));
        }

        // 6. Frozen-account absence
        if metadata.freeze_authority.is_some() {
            checks.push(check(
                "freeze_authority",
                CheckStatus::Warning,
                "freeze authority present",
            ));
            flags.push(flag(FlagSeverity::Medium, "freezable_accounts"));
        } else {
            checks.push(check("freeze_authority", CheckStatus::Pass, "no freeze authority"));
        }

        let mut score: u32 = 0;
        for entry in &checks {
            score += match entry.status {
                CheckStatus::Fail => FAIL_WEIGHT,
                CheckStatus::Warning => WARNING_WEIGHT,
                CheckStatus::Pass => 0,
            };
        }
        for entry in &flags {
            score += match entry.severity {
                FlagSeverity::High => HIGH_FLAG_WEIGHT,
                FlagSeverity::Medium => MEDIUM_FLAG_WEIGHT,
            };
        }
        let score = score.min(100);

        let verdict = if score < SAFE_BELOW {
            SafetyVerdict::Safe
        } else if score < WARNING_BELOW {
            SafetyVerdict::Warning
        } else {
            SafetyVerdict::HighRisk
        };

        SafetyReport {
            mint: metadata.mint.clone(),
            score,
            verdict,
            checks,
            flags,
        }
    }

    /// Classify candidates into at most one MEV category each, based
    /// on the type discriminator the caller supplied. Profit estimates
    /// are carried through untouched; risk labels are fixed per
    /// category. Unrecognized types are skipped.
    pub fn detect_mev_opportunities(&self, candidates: &[MevCandidate]) -> Vec<MevOpportunity> {
        candidates
            .iter()
            .filter_map(|candidate| {
                let (category, risk) = match candidate.tx_type.as_str() {
                    "arbitrage" => (MevCategory::Arbitrage, RiskLevel::Low),
                    "sandwich" => (MevCategory::Sandwich, RiskLevel::High),
                    "liquidation" => (MevCategory::Liquidation, RiskLevel::Medium),
                    _ => return None,
                };
                Some(MevOpportunity {
                    candidate_id: candidate.id.clone(),
                    category,
                    estimated_profit_sol: candidate.estimated_profit_sol,
                    risk,
                })
            })
            .collect()
    }

    /// Per-asset trend from the first vs. last sample, with
    /// population standard-deviation-over-mean as volatility
    pub fn analyze_trend(&self, mint: &str, samples: &[PricePoint]) -> TrendReport {
        if samples.len() < 2 {
            return TrendReport {
                mint: mint.to_string(),
                trend: TrendDirection::InsufficientData,
                change_pct: 0.0,
                volatility: 0.0,
                samples: samples.len(),
            };
        }

        let first = samples[0].price;
        let last = samples[samples.len() - 1].price;
        let change_pct = if first.abs() > f64::EPSILON {
            (last - first) / first * 100.0
        } else {
            0.0
        };

        let trend = if change_pct > TREND_BAND_PCT {
            TrendDirection::Up
        } else if change_pct < -TREND_BAND_PCT {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        };

        let mean = samples.iter().map(|p| p.price).sum::<f64>() / samples.len() as f64;
        let variance = samples
            .iter()
            .map(|p| (p.price - mean).powi(2))
            .sum::<f64>()
            / samples.len() as f64;
        let volatility = if mean.abs() > f64::EPSILON {
            variance.sqrt() / mean
        } else {
            0.0
        };

        TrendReport {
            mint: mint.to_string(),
            trend,
            change_pct,
            volatility,
            samples: samples.len(),
        }
    }

    /// Portfolio risk aggregation. Known stable/major assets are low
    /// risk, dust positions are low regardless of identity, unknown
    /// assets default to medium, and anything in `risky_mints` counts
    /// as high. Risk percentage weights high fully and medium at half.
    pub fn assess_portfolio_risk(
        &self,
        holdings: &[TokenHolding],
        prices: &HashMap<String, PriceInfo>,
        risky_mints: &HashSet<String>,
    ) -> AgentResult<PortfolioRiskReport> {
        if holdings.is_empty() {
            return Err(AgentError::Validation(
                "Portfolio risk needs at least one holding".to_string(),
            ));
        }

        let mut positions: Vec<PositionRisk> = Vec::with_capacity(holdings.len());
        let mut total_value = 0.0;
        let mut high_value = 0.0;
        let mut medium_value = 0.0;

        for holding in holdings {
            let price = prices.get(&holding.mint).map(|p| p.price_usd).unwrap_or(0.0);
            let value = holding.amount * price;
            total_value += value;

            let category = if value < self.dust_threshold_usd {
                RiskCategory::Low
            } else if risky_mints.contains(&holding.mint) {
                RiskCategory::High
            } else if MAJOR_MINTS.contains(&holding.mint.as_str()) {
                RiskCategory::Low
            } else {
                RiskCategory::Medium
            };

            match category {
                RiskCategory::High => high_value += value,
                RiskCategory::Medium => medium_value += value,
                RiskCategory::Low => {}
            }

            positions.push(PositionRisk {
                mint: holding.mint.clone(),
                value_usd: value,
                category,
            });
        }

        let risk_pct = if total_value > 0.0 {
            (high_value + medium_value * 0.5) / total_value * 100.0
        } else {
            0.0
        };

        let level = if risk_pct > 50.0 {
            RiskLevel::High
        } else if risk_pct > 25.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Ok(PortfolioRiskReport {
            total_value_usd: total_value,
            risk_pct,
            level,
            positions,
        })
    }
}

fn check(name: &str, status: CheckStatus, detail: &str) -> SafetyCheck {
    SafetyCheck {
        name: name.to_string(),
        status,
        detail: detail.to_string(),
    }
}

fn flag(severity: FlagSeverity, label: &str) -> SafetyFlag {
    SafetyFlag {
        severity,
        label: label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn worker() -> AnalysisWorker {
        AnalysisWorker::new(&AgentConfig::standard())
    }

    fn clean_metadata(now: DateTime<Utc>) -> TokenMetadata {
        TokenMetadata {
            mint: "MintA".to_string(),
            symbol: "AAA".to_string(),
            name: "Token A".to_string(),
            decimals: 6,
            verified: true,
            created_at: Some(now - ChronoDuration::days(30)),
            upgrade_authority: None,
            freeze_authority: None,
        }
    }

    fn healthy_holders() -> HolderDistribution {
        HolderDistribution {
            mint: "MintA".to_string(),
            top_holder_pct: Some(5.0),
            holder_count: Some(10_000),
            concentration: Concentration::Low,
            risk_score: 10,
        }
    }

    fn deep_liquidity() -> LiquidityDepth {
        LiquidityDepth {
            mint: "MintA".to_string(),
            liquidity_usd: Some(500_000.0),
            pool_count: Some(3),
            risk_score: 10,
        }
    }

    #[test]
    fn all_passes_scores_zero_and_safe() {
        let now = Utc::now();
        let report = worker().token_safety_score(
            &clean_metadata(now),
            &healthy_holders(),
            &deep_liquidity(),
            now,
        );
        assert_eq!(report.score, 0);
        assert_eq!(report.verdict, SafetyVerdict::Safe);
        assert_eq!(report.checks.len(), 6);
        assert!(report.flags.is_empty());
        assert!(report
            .checks
            .iter()
            .all(|c| c.status == CheckStatus::Pass));
    }

    #[test]
    fn no_single_check_reaches_high_risk_alone() {
        let now = Utc::now();
        let mut metadata = clean_metadata(now);
        metadata.upgrade_authority = Some("Authority111".to_string());
        // One fail (30) + one high flag (20) = 50, still below 60
        let report = worker().token_safety_score(
            &metadata,
            &healthy_holders(),
            &deep_liquidity(),
            now,
        );
        assert_eq!(report.score, 50);
        assert_eq!(report.verdict, SafetyVerdict::Warning);
    }

    #[test]
    fn score_is_clamped_to_100() {
        let now = Utc::now();
        let metadata = TokenMetadata {
            mint: "Rug111".to_string(),
            symbol: "???".to_string(),
            name: "Unknown Token".to_string(),
            decimals: 9,
            verified: false,
            created_at: Some(now - ChronoDuration::hours(2)),
            upgrade_authority: Some("Auth".to_string()),
            freeze_authority: Some("Auth".to_string()),
        };
        let holders = HolderDistribution {
            mint: "Rug111".to_string(),
            top_holder_pct: Some(80.0),
            holder_count: Some(12),
            concentration: Concentration::High,
            risk_score: 90,
        };
        let liquidity = LiquidityDepth {
            mint: "Rug111".to_string(),
            liquidity_usd: Some(200.0),
            pool_count: Some(1),
            risk_score: 90,
        };

        let report = worker().token_safety_score(&metadata, &holders, &liquidity, now);
        assert_eq!(report.score, 100);
        assert_eq!(report.verdict, SafetyVerdict::HighRisk);
    }

    #[test]
    fn mev_classification_uses_fixed_risk_labels() {
        let candidates = vec![
            MevCandidate {
                id: "1".to_string(),
                tx_type: "arbitrage".to_string(),
                estimated_profit_sol: 0.4,
            },
            MevCandidate {
                id: "2".to_string(),
                tx_type: "sandwich".to_string(),
                estimated_profit_sol: 1.1,
            },
            MevCandidate {
                id: "3".to_string(),
                tx_type: "liquidation".to_string(),
                estimated_profit_sol: 0.7,
            },
            MevCandidate {
                id: "4".to_string(),
                tx_type: "transfer".to_string(),
                estimated_profit_sol: 0.0,
            },
        ];

        let opportunities = worker().detect_mev_opportunities(&candidates);
        assert_eq!(opportunities.len(), 3);
        assert_eq!(opportunities[0].risk, RiskLevel::Low);
        assert_eq!(opportunities[1].risk, RiskLevel::High);
        assert_eq!(opportunities[2].risk, RiskLevel::Medium);
        assert!((opportunities[1].estimated_profit_sol - 1.1).abs() < f64::EPSILON);
    }

    fn points(prices: &[f64]) -> Vec<PricePoint> {
        let start = Utc::now();
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PricePoint {
                timestamp: start + ChronoDuration::minutes(i as i64),
                price: *p,
            })
            .collect()
    }

    #[test]
    fn trend_labels_follow_five_percent_band() {
        let w = worker();
        assert_eq!(w.analyze_trend("A", &points(&[100.0, 110.0])).trend, TrendDirection::Up);
        assert_eq!(w.analyze_trend("A", &points(&[100.0, 90.0])).trend, TrendDirection::Down);
        assert_eq!(w.analyze_trend("A", &points(&[100.0, 103.0])).trend, TrendDirection::Stable);
    }

    #[test]
    fn short_history_reports_insufficient_data() {
        let report = worker().analyze_trend("A", &points(&[100.0]));
        assert_eq!(report.trend, TrendDirection::InsufficientData);
        assert_eq!(report.change_pct, 0.0);
        assert_eq!(report.volatility, 0.0);
    }

    #[test]
    fn volatility_is_population_stddev_over_mean() {
        let report = worker().analyze_trend("A", &points(&[100.0, 102.0, 98.0, 100.0]));
        // mean 100, population variance (0+4+4+0)/4 = 2
        let expected = 2.0_f64.sqrt() / 100.0;
        assert!((report.volatility - expected).abs() < 1e-9);
    }

    #[test]
    fn portfolio_risk_weights_medium_at_half() {
        let holdings = vec![
            TokenHolding {
                mint: SOL_MINT.to_string(),
                amount: 10.0,
                decimals: 9,
            },
            TokenHolding {
                mint: "Meme111".to_string(),
                amount: 1_000.0,
                decimals: 6,
            },
        ];
        let mut prices = HashMap::new();
        prices.insert(
            SOL_MINT.to_string(),
            PriceInfo {
                price_usd: 100.0,
                change_24h_pct: 0.0,
            },
        );
        prices.insert(
            "Meme111".to_string(),
            PriceInfo {
                price_usd: 1.0,
                change_24h_pct: 0.0,
            },
        );

        let report = worker()
            .assess_portfolio_risk(&holdings, &prices, &HashSet::new())
            .unwrap();
        // 1000 of 2000 total is medium risk, weighted at half => 25%
        assert!((report.total_value_usd - 2_000.0).abs() < f64::EPSILON);
        assert!((report.risk_pct - 25.0).abs() < f64::EPSILON);
        assert_eq!(report.level, RiskLevel::Low);
    }

    #[test]
    fn dust_positions_are_low_risk_regardless_of_identity() {
        let holdings = vec![
            TokenHolding {
                mint: SOL_MINT.to_string(),
                amount: 10.0,
                decimals: 9,
            },
            TokenHolding {
                mint: "Sketchy111".to_string(),
                amount: 1.0,
                decimals: 6,
            },
        ];
        let mut prices = HashMap::new();
        prices.insert(
            SOL_MINT.to_string(),
            PriceInfo {
                price_usd: 100.0,
                change_24h_pct: 0.0,
            },
        );
        prices.insert(
            "Sketchy111".to_string(),
            PriceInfo {
                price_usd: 2.0,
                change_24h_pct: 0.0,
            },
        );
        let mut risky = HashSet::new();
        risky.insert("Sketchy111".to_string());

        let report = worker()
            .assess_portfolio_risk(&holdings, &prices, &risky)
            .unwrap();
        let sketchy = report
            .positions
            .iter()
            .find(|p| p.mint == "Sketchy111")
            .unwrap();
        assert_eq!(sketchy.category, RiskCategory::Low);
        assert_eq!(report.level, RiskLevel::Low);
    }
}
