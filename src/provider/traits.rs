use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::errors::FailureCause;
use crate::models::{Credential, NormalizedRecord, Venue};

/// Per-dispatch context handed to an adapter.
#[derive(Clone, Debug)]
pub struct FetchContext {
    /// Absolute deadline for this fetch. Never later than the snapshot
    /// deadline; the orchestrator also enforces it from the outside.
    pub deadline: Instant,
    /// Resolved credential bundle, or `None` for public data.
    pub credential: Option<Credential>,
}

impl FetchContext {
    pub fn new(deadline: Instant, credential: Option<Credential>) -> Self {
        Self {
            deadline,
            credential,
        }
    }

    /// Time left until the deadline; zero once it has passed. Adapters use
    /// this as their HTTP request timeout.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// The single capability every venue adapter exposes.
///
/// Implementations must:
/// - translate every venue-specific error into a [`FailureCause`];
/// - stamp `observed_at` from their own clock immediately after the
///   venue's response arrives, before normalization;
/// - tolerate partial responses by returning the subset of records they
///   obtained instead of failing the whole call;
/// - abandon their in-flight call promptly when cancelled, and never
///   retry on their own initiative.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Which venue this adapter speaks for.
    fn venue(&self) -> Venue;

    /// Fetch and normalize one round of market data.
    async fn fetch(&self, ctx: &FetchContext) -> Result<Vec<NormalizedRecord>, FailureCause>;
}
