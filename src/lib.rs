//! Venue Aggregator
//!
//! Normalized market data snapshots across unrelated external venues:
//! prediction markets, stock brokers and crypto exchanges. Downstream
//! strategy code sees one schema and one status report, never a venue API.
//!
//! # Architecture
//!
//! ```text
//! +------------------+      +------------------+
//! |      Caller      | ---> |    Aggregator    |  get_snapshot(budget)
//! +------------------+      +------------------+
//!                              |      |      |
//!                    mode gate |      |      | rate limiter
//!                              v      v      v
//!                      +---------------------------+
//!                      |       VenueAdapter        |  (one per venue)
//!                      | Polymarket Alpaca Binance |
//!                      +---------------------------+
//!                                   |
//!                                   v
//!                         +------------------+
//!                         | NormalizedRecord |  merged + provenance
//!                         +------------------+
//! ```
//!
//! Providers fail independently: a venue outage, an exhausted rate-limit
//! window or a missing credential shrinks the snapshot, it never fails it.
//! The status report carries one entry per configured provider per round.
//!
//! # Core Types
//!
//! - [`Aggregator`] - the orchestrator; fixed [`OperatingMode`] per instance
//! - [`VenueAdapter`] - the single capability every venue implements
//! - [`NormalizedRecord`] - one observed market fact, source-tagged
//! - [`ProviderDescriptor`] - static per-provider configuration
//! - [`Snapshot`] / [`StatusReport`] - merged records plus per-provider
//!   outcomes

pub mod aggregator;
pub mod errors;
pub mod gate;
pub mod limiter;
pub mod models;
pub mod provider;

// Re-export the public surface
pub use aggregator::{Aggregator, ConfiguredProvider};
pub use errors::{AggregatorError, FailureCause};
pub use gate::{eligible, Eligibility};
pub use limiter::RateLimiter;
pub use models::{
    Credential, FetchOutcome, NormalizedRecord, OperatingMode, ProviderDescriptor, ProviderStatus,
    RateLimitPolicy, RecordKey, Snapshot, StatusReport, Venue,
};
pub use provider::{FetchContext, VenueAdapter};

// Re-export the reference adapters
pub use provider::alpaca::AlpacaAdapter;
pub use provider::binance::BinanceAdapter;
pub use provider::polymarket::PolymarketAdapter;
