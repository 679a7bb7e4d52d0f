/// Lookup worker - cached reads of external reference data
///
/// Fetch behavior is deliberately asymmetric: metadata, holder
/// distribution and liquidity lookups are best-effort and degrade to
/// conservative placeholders, while price and holdings fetches raise
/// on failure because downstream math cannot proceed without them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::clients::{
    HolderDistribution, LiquidityDepth, PriceInfo, RpcInterface, TokenHolding, TokenMetadata,
    TokenOracle,
};
use crate::config::{AgentConfig, WorkerConfig};
use crate::errors::{AgentError, AgentResult};
use crate::logger::{self, LogTag};

/// Scratch-space namespace used for every value this worker stages
pub const NAMESPACE: &str = "lookup";

pub struct LookupWorker {
    oracle: Arc<dyn TokenOracle>,
    rpc: Arc<dyn RpcInterface>,
    config: WorkerConfig,
    metadata_cache: TtlCache<String, TokenMetadata>,
    price_cache: TtlCache<String, PriceInfo>,
}

impl LookupWorker {
    pub const NAME: &'static str = "lookup";

    pub fn new(oracle: Arc<dyn TokenOracle>, rpc: Arc<dyn RpcInterface>, config: &AgentConfig) -> Self {
        Self {
            oracle,
            rpc,
            config: config.lookup.clone(),
            metadata_cache: TtlCache::new(
                Duration::from_secs(config.cache.metadata_ttl_secs),
                config.cache.capacity,
            ),
            price_cache: TtlCache::new(
                Duration::from_secs(config.cache.price_ttl_secs),
                config.cache.capacity,
            ),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Cache-or-fetch token metadata. A failed fetch yields the
    /// degraded placeholder (symbol "???", unverified) instead of an
    /// error - metadata must never block a strategy.
    pub async fn resolve_token_metadata(&self, mint: &str) -> AgentResult<TokenMetadata> {
        if mint.is_empty() {
            return Err(AgentError::Validation("Mint cannot be empty".to_string()));
        }

        if let Some(hit) = self.metadata_cache.get(&mint.to_string()) {
            logger::debug(LogTag::Lookup, "METADATA_CACHE_HIT", &format!("mint={}", mint));
            return Ok(hit);
        }

        match self.oracle.metadata(mint).await {
            Ok(metadata) => {
                self.metadata_cache.insert(mint.to_string(), metadata.clone());
                Ok(metadata)
            }
            Err(err) => {
                logger::warning(
                    LogTag::Lookup,
                    "METADATA_FALLBACK",
                    &format!("mint={} error={}", mint, err),
                );
                // Placeholders are not cached so the next call refetches
                Ok(TokenMetadata::placeholder(mint))
            }
        }
    }

    /// Fetch prices for a set of mints. Cache hits are served
    /// directly; misses go out in one batched oracle call. A failed
    /// batch fetch raises (individual missing entries do not).
    pub async fn fetch_prices(&self, mints: &[String]) -> AgentResult<HashMap<String, PriceInfo>> {
        if mints.is_empty() {
            return Err(AgentError::Validation(
                "Price lookup requires at least one mint".to_string(),
            ));
        }

        let mut merged: HashMap<String, PriceInfo> = HashMap::new();
        let mut misses: Vec<String> = Vec::new();

        for mint in mints {
            match self.price_cache.get(mint) {
                Some(price) => {
                    merged.insert(mint.clone(), price);
                }
                None => misses.push(mint.clone()),
            }
        }

        logger::debug(
            LogTag::Lookup,
            "PRICE_PARTITION",
            &format!("requested={} hits={} misses={}", mints.len(), merged.len(), misses.len()),
        );

        if !misses.is_empty() {
            let fetched = self.oracle.prices(&misses).await?;
            for (mint, price) in fetched {
                self.price_cache.insert(mint.clone(), price);
                merged.insert(mint, price);
            }
        }

        Ok(merged)
    }

    /// Enumerate token-account records for a wallet. Raises on
    /// enumeration failure - holdings feed sizing math downstream.
    pub async fn fetch_wallet_holdings(&self, address: &str) -> AgentResult<Vec<TokenHolding>> {
        if address.is_empty() {
            return Err(AgentError::Validation(
                "Wallet address cannot be empty".to_string(),
            ));
        }
        self.rpc.get_token_accounts(address).await
    }

    /// Best-effort holder analytics; an unreachable source yields the
    /// conservative unknown result rather than blocking the strategy.
    pub async fn fetch_holder_distribution(&self, mint: &str) -> AgentResult<HolderDistribution> {
        if mint.is_empty() {
            return Err(AgentError::Validation("Mint cannot be empty".to_string()));
        }
        match self.oracle.holder_distribution(mint).await {
            Ok(distribution) => Ok(distribution),
            Err(err) => {
                logger::warning(
                    LogTag::Lookup,
                    "HOLDERS_FALLBACK",
                    &format!("mint={} error={}", mint, err),
                );
                Ok(HolderDistribution::unknown(mint))
            }
        }
    }

    /// Best-effort liquidity analytics, same degradation rule
    pub async fn fetch_liquidity_depth(&self, mint: &str) -> AgentResult<LiquidityDepth> {
        if mint.is_empty() {
            return Err(AgentError::Validation("Mint cannot be empty".to_string()));
        }
        match self.oracle.liquidity_depth(mint).await {
            Ok(depth) => Ok(depth),
            Err(err) => {
                logger::warning(
                    LogTag::Lookup,
                    "LIQUIDITY_FALLBACK",
                    &format!("mint={} error={}", mint, err),
                );
                Ok(LiquidityDepth::unknown(mint))
            }
        }
    }

    pub fn cache_metrics(&self) -> (crate::cache::CacheMetrics, crate::cache::CacheMetrics) {
        (self.metadata_cache.metrics(), self.price_cache.metrics())
    }
}
