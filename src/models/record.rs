use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::venue::Venue;

/// One observed market fact, shape-identical regardless of which venue
/// produced it.
///
/// Price fields are `Option<Decimal>`: absent means "the venue did not
/// report this", never zero, since zero is a valid price on prediction
/// markets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Venue-local market or symbol identifier. Required non-empty.
    pub market_id: String,

    /// Source tag; the merge never collapses records across venues.
    pub venue: Venue,

    /// Last traded or quoted price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,

    /// Non-negative when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    /// Stamped by the adapter at the moment the venue's response arrived,
    /// before normalization.
    pub observed_at: DateTime<Utc>,

    /// Venue-specific extras, kept in venue order for diagnostics and
    /// never interpreted by the orchestrator.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub raw_fields: Map<String, Value>,
}

/// Identity of a record inside one snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub venue: Venue,
    pub market_id: String,
    pub observed_at: DateTime<Utc>,
}

impl NormalizedRecord {
    /// Create a record with all market fields unset.
    pub fn new(venue: Venue, market_id: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            market_id: market_id.into(),
            venue,
            price: None,
            bid: None,
            ask: None,
            volume: None,
            observed_at,
            raw_fields: Map::new(),
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            venue: self.venue,
            market_id: self.market_id.clone(),
            observed_at: self.observed_at,
        }
    }
}
