/// Runtime configuration for the agent framework
///
/// All tunables live here: per-worker retry/timeout envelopes, cache
/// TTLs and the transaction worker settings. Defaults are sane for
/// mainnet usage; a host application can override them by loading an
/// `agent_configs.json` file with the same shape.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry/timeout envelope applied to one worker type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl WorkerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 3,
            initial_delay_ms: 500,
            backoff_multiplier: 2.0,
            max_delay_ms: 5_000,
        }
    }
}

/// Cache TTLs, one per cached lookup family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub price_ttl_secs: u64,
    pub metadata_ttl_secs: u64,
    pub quote_ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            price_ttl_secs: 300,  // prices stay valid for 5 minutes
            metadata_ttl_secs: 3_600,
            quote_ttl_secs: 30,   // route quotes go stale fast
            capacity: 2_048,
        }
    }
}

/// Transaction worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Base signature fee in lamports
    pub base_fee_lamports: u64,
    /// Priority fee price in micro-lamports per compute unit
    pub cu_price_micro_lamports: u64,
    /// Fee ceiling applied when the caller does not supply one (SOL)
    pub default_fee_ceiling_sol: f64,
    /// Confirmation polling bounds
    pub max_confirmation_polls: u32,
    pub confirmation_poll_interval_ms: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            base_fee_lamports: 5_000,
            cu_price_micro_lamports: 1_000,
            default_fee_ceiling_sol: 0.1,
            max_confirmation_polls: 60,
            confirmation_poll_interval_ms: 5_000,
        }
    }
}

/// Top-level framework configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub lookup: WorkerConfig,
    pub analysis: WorkerConfig,
    pub builder: WorkerConfig,
    pub transaction: WorkerConfig,
    pub cache: CacheConfig,
    pub tx: TransactionConfig,
    /// Rebalance tolerance in percentage points
    pub rebalance_tolerance_pct: f64,
    /// Assumed tax rate for harvest estimates
    pub tax_rate: f64,
    /// Position value below which a holding counts as dust (USD)
    pub dust_threshold_usd: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl AgentConfig {
    /// Defaults tuned per worker family: analysis is local computation
    /// (short timeout, single retry), transactions get a longer window
    /// and a slower backoff ceiling.
    pub fn standard() -> Self {
        Self {
            lookup: WorkerConfig::default(),
            analysis: WorkerConfig {
                timeout_ms: 5_000,
                max_retries: 2,
                initial_delay_ms: 500,
                backoff_multiplier: 2.0,
                max_delay_ms: 5_000,
            },
            builder: WorkerConfig::default(),
            transaction: WorkerConfig {
                timeout_ms: 30_000,
                max_retries: 2,
                initial_delay_ms: 1_000,
                backoff_multiplier: 2.0,
                max_delay_ms: 10_000,
            },
            cache: CacheConfig::default(),
            tx: TransactionConfig::default(),
            rebalance_tolerance_pct: 2.0,
            tax_rate: 0.25,
            dust_threshold_usd: 10.0,
        }
    }

    /// Reads an agent_configs.json file and merges it over defaults
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: AgentConfig = serde_json::from_str(&raw)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_defaults_within_bounds() {
        let cfg = AgentConfig::standard();
        assert!(cfg.lookup.initial_delay_ms >= 500 && cfg.lookup.initial_delay_ms <= 1_000);
        assert!(cfg.transaction.max_delay_ms <= 10_000);
        assert_eq!(cfg.tx.max_confirmation_polls, 60);
        assert_eq!(cfg.rebalance_tolerance_pct, 2.0);
    }

    #[test]
    fn partial_json_merges_over_defaults() {
        let cfg: AgentConfig =
            serde_json::from_str(r#"{"rebalance_tolerance_pct": 5.0}"#).unwrap();
        assert_eq!(cfg.rebalance_tolerance_pct, 5.0);
        assert_eq!(cfg.cache.quote_ttl_secs, 30);
    }
}
