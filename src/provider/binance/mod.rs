//! Binance spot exchange adapter.
//!
//! Fetches best bid/ask from the public book ticker endpoint. Prices and
//! quantities arrive as decimal strings, which `rust_decimal` parses
//! without loss.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::errors::FailureCause;
use crate::models::{NormalizedRecord, Venue};
use crate::provider::{FetchContext, VenueAdapter};

const API_BASE: &str = "https://api.binance.com";

/// Default HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One row of `/api/v3/ticker/bookTicker`.
#[derive(Debug, Deserialize)]
struct BookTicker {
    #[serde(default)]
    symbol: String,
    #[serde(rename = "bidPrice", default)]
    bid_price: Option<Decimal>,
    #[serde(rename = "bidQty", default)]
    bid_qty: Option<Decimal>,
    #[serde(rename = "askPrice", default)]
    ask_price: Option<Decimal>,
    #[serde(rename = "askQty", default)]
    ask_qty: Option<Decimal>,
}

/// Adapter for Binance's public spot book ticker.
pub struct BinanceAdapter {
    client: Client,
    base_url: String,
    symbols: Vec<String>,
}

impl BinanceAdapter {
    pub fn new(symbols: Vec<String>) -> Self {
        Self::with_base_url(API_BASE, symbols)
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

    /// The batch endpoint wants `symbols=["BTCUSDT","ETHUSDT"]`, with the
    /// JSON array percent-encoded into the query string.
    fn symbols_param(&self) -> String {
        let quoted: Vec<String> = self.symbols.iter().map(|s| format!("\"{s}\"")).collect();
        urlencoding::encode(&format!("[{}]", quoted.join(","))).into_owned()
    }
}

#[async_trait]
impl VenueAdapter for BinanceAdapter {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Vec<NormalizedRecord>, FailureCause> {
        let remaining = ctx.remaining();
        if remaining.is_zero() {
            return Err(FailureCause::Timeout);
        }

        let url = format!(
            "{}/api/v3/ticker/bookTicker?symbols={}",
            self.base_url,
            self.symbols_param()
        );

        let response = self
            .client
            .get(url)
            .timeout(remaining.min(REQUEST_TIMEOUT))
            .send()
            .await
            .map_err(|e| FailureCause::from_transport(Venue::Binance, &e))?;

        if !response.status().is_success() {
            return Err(FailureCause::from_status(response.status()));
        }

        let observed_at = Utc::now();

        let tickers: Vec<BookTicker> =
            response.json().await.map_err(|e| FailureCause::SchemaMismatch {
                detail: format!("binance book ticker payload: {e}"),
            })?;

        let total = tickers.len();
        let records: Vec<NormalizedRecord> = tickers
            .into_iter()
            .filter_map(|t| normalize_ticker(t, observed_at))
            .collect();

        if records.is_empty() && total > 0 {
            return Err(FailureCause::SchemaMismatch {
                detail: format!("none of {total} book ticker rows were usable"),
            });
        }

        debug!(
            "binance: normalized {}/{} book ticker rows",
            records.len(),
            total
        );
        Ok(records)
    }
}

fn normalize_ticker(
    ticker: BookTicker,
    observed_at: chrono::DateTime<Utc>,
) -> Option<NormalizedRecord> {
    if ticker.symbol.trim().is_empty() {
        warn!("binance: dropping book ticker row without symbol");
        return None;
    }

    let mut record = NormalizedRecord::new(Venue::Binance, ticker.symbol, observed_at);
    record.bid = ticker.bid_price;
    record.ask = ticker.ask_price;

    if let Some(bid_qty) = ticker.bid_qty {
        record
            .raw_fields
            .insert("bid_qty".to_string(), Value::String(bid_qty.to_string()));
    }
    if let Some(ask_qty) = ticker.ask_qty {
        record
            .raw_fields
            .insert("ask_qty".to_string(), Value::String(ask_qty.to_string()));
    }

    Some(record)
}
