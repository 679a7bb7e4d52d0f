/// Jupiter quote API adapter
///
/// Concrete `QuoteApi` implementation over the Jupiter v6 quote
/// endpoint. Retries are NOT handled here - the worker retry engine
/// wraps every call, so this client surfaces transport failures
/// as-is and lets the engine classify them.

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::{AgentError, AgentResult};
use crate::logger::{self, LogTag};

use super::{QuoteApi, QuoteRequest, QuoteResponse, RoutePlanStep};

const JUPITER_QUOTE_URL: &str = "https://quote-api.jup.ag/v6/quote";

/// Jupiter quote response wire format (amounts arrive as strings)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterQuote {
    input_mint: String,
    in_amount: String,
    output_mint: String,
    out_amount: String,
    other_amount_threshold: String,
    #[serde(default)]
    price_impact_pct: String,
    #[serde(default)]
    route_plan: Vec<JupiterRoutePlan>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterRoutePlan {
    swap_info: JupiterSwapInfo,
    percent: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterSwapInfo {
    label: String,
    input_mint: String,
    output_mint: String,
    in_amount: String,
    out_amount: String,
}

pub struct JupiterQuoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl JupiterQuoteClient {
    pub fn new() -> Self {
        Self::with_base_url(JUPITER_QUOTE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }
}

impl Default for JupiterQuoteClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteApi for JupiterQuoteClient {
    async fn quote(&self, request: &QuoteRequest) -> AgentResult<QuoteResponse> {
        let url = format!(
            "{}?inputMint={}&outputMint={}&amount={}&slippageBps={}",
            self.base_url,
            request.input_mint,
            request.output_mint,
            request.amount,
            request.slippage_bps
        );

        logger::debug(
            LogTag::Api,
            "QUOTE_REQUEST",
            &format!(
                "input={} output={} amount={} slippage_bps={}",
                short_mint(&request.input_mint),
                short_mint(&request.output_mint),
                request.amount,
                request.slippage_bps
            ),
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Api(format!("HTTP error {}: {}", status, body)));
        }

        let quote: JupiterQuote = response
            .json()
            .await
            .map_err(|e| AgentError::Api(format!("Invalid quote response: {}", e)))?;

        let in_amount = parse_amount(&quote.in_amount, "inAmount")?;
        let out_amount = parse_amount(&quote.out_amount, "outAmount")?;
        let out_amount_with_slippage = parse_amount(&quote.other_amount_threshold, "otherAmountThreshold")?;
        let price_impact_pct = quote.price_impact_pct.parse::<f64>().unwrap_or(0.0);

        let route_plan = quote
            .route_plan
            .iter()
            .map(|hop| {
                Ok(RoutePlanStep {
                    venue: hop.swap_info.label.clone(),
                    input_mint: hop.swap_info.input_mint.clone(),
                    output_mint: hop.swap_info.output_mint.clone(),
                    in_amount: parse_amount(&hop.swap_info.in_amount, "route inAmount")?,
                    out_amount: parse_amount(&hop.swap_info.out_amount, "route outAmount")?,
                    percent: hop.percent,
                })
            })
            .collect::<AgentResult<Vec<_>>>()?;

        Ok(QuoteResponse {
            input_mint: quote.input_mint,
            output_mint: quote.output_mint,
            in_amount,
            out_amount,
            out_amount_with_slippage,
            price_impact_pct,
            route_plan,
        })
    }
}

/// Log-friendly mint prefix; counts chars, never byte-slices
fn short_mint(mint: &str) -> String {
    mint.chars().take(8).collect()
}

fn parse_amount(raw: &str, field: &str) -> AgentResult<u64> {
    raw.parse::<u64>()
        .map_err(|_| AgentError::Api(format!("Invalid {} in quote response: {}", field, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_jupiter_wire_format() {
        let raw = r#"{
            "inputMint": "So11111111111111111111111111111111111111112",
            "inAmount": "1000000000",
            "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "outAmount": "152340000",
            "otherAmountThreshold": "151578300",
            "priceImpactPct": "0.05",
            "routePlan": [
                {
                    "swapInfo": {
                        "label": "Orca",
                        "inputMint": "So11111111111111111111111111111111111111112",
                        "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                        "inAmount": "1000000000",
                        "outAmount": "152340000",
                        "feeAmount": "300000",
                        "feeMint": "So11111111111111111111111111111111111111112"
                    },
                    "percent": 100
                }
            ]
        }"#;

        let quote: JupiterQuote = serde_json::from_str(raw).unwrap();
        assert_eq!(quote.in_amount, "1000000000");
        assert_eq!(quote.route_plan.len(), 1);
        assert_eq!(quote.route_plan[0].swap_info.label, "Orca");
        assert_eq!(parse_amount(&quote.out_amount, "outAmount").unwrap(), 152_340_000);
    }

    #[test]
    fn rejects_malformed_amounts() {
        assert!(parse_amount("not-a-number", "inAmount").is_err());
    }

    #[test]
    fn mint_prefix_respects_char_boundaries() {
        assert_eq!(short_mint("So11111111111111111111111111111111111111112"), "So111111");
        assert_eq!(short_mint("ab"), "ab");
        // Multibyte input must truncate by characters, not bytes
        assert_eq!(short_mint("токен-мінт-адреса"), "токен-мі");
    }
}
