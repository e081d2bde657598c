//! Polymarket prediction-market adapter.
//!
//! Fetches market summaries from the public Gamma API. No credential is
//! required; the same endpoint serves simulation and live data.
//!
//! Gamma quirks handled here: numeric fields arrive as JSON strings as
//! often as numbers, and array fields (e.g. `outcomes`) sometimes arrive
//! as a stringified JSON array.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::FailureCause;
use crate::models::{NormalizedRecord, Venue};
use crate::provider::{FetchContext, VenueAdapter};

const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

/// Default HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One market row from the Gamma `/markets` endpoint.
#[derive(Debug, Deserialize)]
struct GammaMarket {
    #[serde(default)]
    slug: String,
    #[serde(default)]
    question: Option<String>,
    #[serde(rename = "conditionId", default)]
    condition_id: Option<String>,
    #[serde(rename = "bestBid", default, deserialize_with = "de_decimal_opt")]
    best_bid: Option<Decimal>,
    #[serde(rename = "bestAsk", default, deserialize_with = "de_decimal_opt")]
    best_ask: Option<Decimal>,
    #[serde(
        rename = "lastTradePrice",
        default,
        deserialize_with = "de_decimal_opt"
    )]
    last_trade_price: Option<Decimal>,
    #[serde(rename = "volumeNum", default, deserialize_with = "de_decimal_opt")]
    volume: Option<Decimal>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    closed: Option<bool>,
}

/// Tolerant decimal field: number, numeric string, empty string or null.
fn de_decimal_opt<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    Ok(match v {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) if !s.trim().is_empty() => Decimal::from_str(s.trim()).ok(),
        _ => None,
    })
}

/// Adapter for Polymarket's public Gamma API.
pub struct PolymarketAdapter {
    client: Client,
    base_url: String,
    /// Market slugs this adapter watches.
    slugs: Vec<String>,
}

impl PolymarketAdapter {
    pub fn new(slugs: Vec<String>) -> Self {
        Self::with_base_url(GAMMA_API_BASE, slugs)
    }

    pub fn with_base_url(base_url: impl Into<String>, slugs: Vec<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
            slugs,
        }
    }
}

#[async_trait]
impl VenueAdapter for PolymarketAdapter {
    fn venue(&self) -> Venue {
        Venue::Polymarket
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Vec<NormalizedRecord>, FailureCause> {
        let remaining = ctx.remaining();
        if remaining.is_zero() {
            return Err(FailureCause::Timeout);
        }

        // One batch call; Gamma accepts repeated slug parameters and
        // returns rows for the slugs it recognizes, which may be a subset.
        let query: Vec<(&str, &str)> = self
            .slugs
            .iter()
            .map(|s| ("slug", s.as_str()))
            .collect();

        let response = self
            .client
            .get(format!("{}/markets", self.base_url))
            .query(&query)
            .timeout(remaining.min(REQUEST_TIMEOUT))
            .send()
            .await
            .map_err(|e| FailureCause::from_transport(Venue::Polymarket, &e))?;

        if !response.status().is_success() {
            return Err(FailureCause::from_status(response.status()));
        }

        // Stamp before normalization so parse latency never skews
        // observation times.
        let observed_at = Utc::now();

        let markets: Vec<GammaMarket> = response.json().await.map_err(|e| {
            FailureCause::SchemaMismatch {
                detail: format!("gamma markets payload: {e}"),
            }
        })?;

        let total = markets.len();
        let records: Vec<NormalizedRecord> = markets
            .into_iter()
            .filter_map(|m| normalize_market(m, observed_at))
            .collect();

        if records.is_empty() && total > 0 {
            return Err(FailureCause::SchemaMismatch {
                detail: format!("none of {total} gamma rows were usable"),
            });
        }

        debug!(
            "polymarket: normalized {}/{} markets for {} slugs",
            records.len(),
            total,
            self.slugs.len()
        );
        Ok(records)
    }
}

/// Map one Gamma row into the normalized schema. Rows without a slug are
/// unusable and dropped.
fn normalize_market(
    market: GammaMarket,
    observed_at: chrono::DateTime<Utc>,
) -> Option<NormalizedRecord> {
    if market.slug.trim().is_empty() {
        warn!("polymarket: dropping gamma row without slug");
        return None;
    }

    let mut record = NormalizedRecord::new(Venue::Polymarket, market.slug, observed_at);
    record.price = market.last_trade_price;
    record.bid = market.best_bid;
    record.ask = market.best_ask;
    record.volume = market.volume;

    if let Some(question) = market.question {
        record
            .raw_fields
            .insert("question".to_string(), Value::String(question));
    }
    if let Some(condition_id) = market.condition_id {
        record
            .raw_fields
            .insert("condition_id".to_string(), Value::String(condition_id));
    }
    if let Some(active) = market.active {
        record
            .raw_fields
            .insert("active".to_string(), Value::Bool(active));
    }
    if let Some(closed) = market.closed {
        record
            .raw_fields
            .insert("closed".to_string(), Value::Bool(closed));
    }

    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parses_string_encoded_numbers() {
        let payload = r#"{
            "slug": "will-it-rain-tomorrow",
            "question": "Will it rain tomorrow?",
            "conditionId": "0xabc123",
            "bestBid": "0.42",
            "bestAsk": 0.44,
            "lastTradePrice": "0.43",
            "volumeNum": "15230.5",
            "active": true,
            "closed": false
        }"#;

        let market: GammaMarket = serde_json::from_str(payload).unwrap();
        let record = normalize_market(market, Utc::now()).unwrap();

        assert_eq!(record.market_id, "will-it-rain-tomorrow");
        assert_eq!(record.venue, Venue::Polymarket);
        assert_eq!(record.bid, Some(dec!(0.42)));
        assert_eq!(record.ask, Some(dec!(0.44)));
        assert_eq!(record.price, Some(dec!(0.43)));
        assert_eq!(record.volume, Some(dec!(15230.5)));
        assert_eq!(
            record.raw_fields.get("condition_id"),
            Some(&Value::String("0xabc123".to_string()))
        );
    }

    #[test]
    fn test_missing_prices_stay_unset() {
        let payload = r#"{"slug": "quiet-market", "bestBid": "", "lastTradePrice": null}"#;
        let market: GammaMarket = serde_json::from_str(payload).unwrap();
        let record = normalize_market(market, Utc::now()).unwrap();

        assert!(record.price.is_none());
        assert!(record.bid.is_none());
        assert!(record.ask.is_none());
    }

    #[test]
    fn test_zero_price_survives_normalization() {
        // 0 is a real price on prediction markets; it must not collapse
        // into "unset".
        let payload = r#"{"slug": "resolved-no", "lastTradePrice": 0}"#;
        let market: GammaMarket = serde_json::from_str(payload).unwrap();
        let record = normalize_market(market, Utc::now()).unwrap();
        assert_eq!(record.price, Some(dec!(0)));
    }

    #[test]
    fn test_row_without_slug_is_dropped() {
        let payload = r#"{"slug": "", "lastTradePrice": "0.5"}"#;
        let market: GammaMarket = serde_json::from_str(payload).unwrap();
        assert!(normalize_market(market, Utc::now()).is_none());
    }

    #[test]
    fn test_raw_fields_preserve_insertion_order() {
        let payload = r#"{
            "slug": "ordered",
            "question": "q",
            "conditionId": "0x1",
            "active": true,
            "closed": false
        }"#;
        let market: GammaMarket = serde_json::from_str(payload).unwrap();
        let record = normalize_market(market, Utc::now()).unwrap();

        let keys: Vec<&str> = record.raw_fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["question", "condition_id", "active", "closed"]);
    }
}
