//! Alpaca broker adapter.
//!
//! Fetches latest stock quotes from the Alpaca market data API. A
//! credential is mandatory; the bundle is the `key_id:secret` pair the
//! host resolved from its secret store. Paper-trading keys work against
//! the same data endpoint, which is what makes this provider usable in
//! simulation mode.

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::FailureCause;
use crate::models::{NormalizedRecord, Venue};
use crate::provider::{FetchContext, VenueAdapter};

const DATA_API_BASE: &str = "https://data.alpaca.markets";

const KEY_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

/// Default HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Response of `/v2/stocks/quotes/latest`: a map keyed by symbol. Symbols
/// the venue does not recognize are simply absent, so a batch request
/// naturally yields a partial result.
#[derive(Debug, Deserialize)]
struct LatestQuotesResponse {
    #[serde(default)]
    quotes: HashMap<String, AlpacaQuote>,
}

#[derive(Debug, Deserialize)]
struct AlpacaQuote {
    /// Ask price.
    #[serde(default)]
    ap: Option<Decimal>,
    /// Ask size.
    #[serde(rename = "as", default)]
    ask_size: Option<Decimal>,
    /// Bid price.
    #[serde(default)]
    bp: Option<Decimal>,
    /// Bid size.
    #[serde(default)]
    bs: Option<Decimal>,
    /// Venue timestamp (RFC 3339).
    #[serde(default)]
    t: Option<String>,
}

/// Adapter for Alpaca's authenticated stock data API.
pub struct AlpacaAdapter {
    client: Client,
    base_url: String,
    symbols: Vec<String>,
}

impl AlpacaAdapter {
    pub fn new(symbols: Vec<String>) -> Self {
        Self::with_base_url(DATA_API_BASE, symbols)
    }

    pub fn with_base_url(base_url: impl Into<String>, symbols: Vec<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
            symbols,
        }
    }
}

#[async_trait]
impl VenueAdapter for AlpacaAdapter {
    fn venue(&self) -> Venue {
        Venue::Alpaca
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Vec<NormalizedRecord>, FailureCause> {
        let credential = ctx.credential.as_ref().ok_or(FailureCause::AuthMissing)?;
        let (key_id, secret) = split_credential(credential.expose())?;

        let remaining = ctx.remaining();
        if remaining.is_zero() {
            return Err(FailureCause::Timeout);
        }

        let response = self
            .client
            .get(format!("{}/v2/stocks/quotes/latest", self.base_url))
            .query(&[("symbols", self.symbols.join(","))])
            .header(KEY_HEADER, key_id)
            .header(SECRET_HEADER, secret)
            .timeout(remaining.min(REQUEST_TIMEOUT))
            .send()
            .await
            .map_err(|e| FailureCause::from_transport(Venue::Alpaca, &e))?;

        if !response.status().is_success() {
            return Err(FailureCause::from_status(response.status()));
        }

        let observed_at = Utc::now();

        let payload: LatestQuotesResponse =
            response.json().await.map_err(|e| FailureCause::SchemaMismatch {
                detail: format!("alpaca quotes payload: {e}"),
            })?;

        let records: Vec<NormalizedRecord> = payload
            .quotes
            .into_iter()
            .filter(|(symbol, _)| !symbol.trim().is_empty())
            .map(|(symbol, quote)| normalize_quote(symbol, quote, observed_at))
            .collect();

        debug!(
            "alpaca: normalized {} of {} requested symbols",
            records.len(),
            self.symbols.len()
        );
        Ok(records)
    }
}

/// The credential bundle is an opaque `key_id:secret` pair; anything else
/// is an auth misconfiguration.
fn split_credential(bundle: &str) -> Result<(&str, &str), FailureCause> {
    match bundle.split_once(':') {
        Some((key_id, secret)) if !key_id.is_empty() && !secret.is_empty() => Ok((key_id, secret)),
        _ => Err(FailureCause::AuthMissing),
    }
}

fn normalize_quote(
    symbol: String,
    quote: AlpacaQuote,
    observed_at: chrono::DateTime<Utc>,
) -> NormalizedRecord {
    let mut record = NormalizedRecord::new(Venue::Alpaca, symbol, observed_at);
    record.bid = quote.bp;
    record.ask = quote.ap;

    if let Some(bs) = quote.bs {
        record
            .raw_fields
            .insert("bid_size".to_string(), Value::String(bs.to_string()));
    }
    if let Some(ask_size) = quote.ask_size {
        record
            .raw_fields
            .insert("ask_size".to_string(), Value::String(ask_size.to_string()));
    }
    if let Some(t) = quote.t {
        record
            .raw_fields
            .insert("venue_time".to_string(), Value::String(t));
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parses_latest_quotes_map() {
        let payload = r#"{
            "quotes": {
                "AAPL": {"t": "2026-08-30T14:30:00Z", "ap": 232.11, "as": 2, "bp": 232.05, "bs": 3},
                "MSFT": {"t": "2026-08-30T14:30:01Z", "ap": 511.4, "bp": 511.2}
            }
        }"#;

        let parsed: LatestQuotesResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.quotes.len(), 2);

        let at = Utc::now();
        let record = normalize_quote(
            "AAPL".to_string(),
            parsed.quotes.into_iter().find(|(s, _)| s == "AAPL").unwrap().1,
            at,
        );
        assert_eq!(record.venue, Venue::Alpaca);
        assert_eq!(record.bid, Some(dec!(232.05)));
        assert_eq!(record.ask, Some(dec!(232.11)));
        assert!(record.price.is_none());
        assert_eq!(record.observed_at, at);
        assert_eq!(
            record.raw_fields.get("venue_time"),
            Some(&Value::String("2026-08-30T14:30:00Z".to_string()))
        );
    }

    #[test]
    fn test_partial_batch_is_a_subset_not_a_failure() {
        // The venue only knew one of the requested symbols.
        let payload = r#"{"quotes": {"AAPL": {"ap": 232.11, "bp": 232.05}}}"#;
        let parsed: LatestQuotesResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(parsed.quotes.len(), 1);
    }

    #[test]
    fn test_split_credential() {
        assert_eq!(
            split_credential("PKTEST123:supersecret").unwrap(),
            ("PKTEST123", "supersecret")
        );
        assert_eq!(
            split_credential("no-separator").unwrap_err(),
            FailureCause::AuthMissing
        );
        assert_eq!(
            split_credential(":missing-key").unwrap_err(),
            FailureCause::AuthMissing
        );
    }
}
