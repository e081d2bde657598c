use std::fmt;

use serde::{Deserialize, Serialize};

/// One external data platform the aggregator knows how to talk to.
///
/// The variant doubles as the stable provider id used in logs, the rate
/// limiter and the status report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    /// Polymarket prediction markets (public Gamma API).
    Polymarket,
    /// Alpaca stock broker (authenticated market data API).
    Alpaca,
    /// Binance spot exchange (public book ticker API).
    Binance,
}

impl Venue {
    /// Stable uppercase identifier, e.g. `"POLYMARKET"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Polymarket => "POLYMARKET",
            Venue::Alpaca => "ALPACA",
            Venue::Binance => "BINANCE",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
