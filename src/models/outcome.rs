//! Per-provider outcome tracking for one snapshot round.

use crate::errors::FailureCause;

use super::record::NormalizedRecord;
use super::venue::Venue;

/// What one provider contributed to a snapshot. Exactly one of success or
/// a failure cause holds; `NotConfigured` marks mode-gate exclusion, which
/// is a normal state distinct from a fetch failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Failed(FailureCause),
    NotConfigured,
}

/// One status-report entry.
#[derive(Clone, Debug)]
pub struct ProviderStatus {
    pub venue: Venue,
    pub outcome: FetchOutcome,
    /// Records this provider contributed to the merged set. Always zero
    /// for non-success outcomes.
    pub record_count: usize,
}

/// Per-provider status for one snapshot round: one entry per configured
/// provider, including the rate-limited and not-configured ones.
#[derive(Clone, Debug, Default)]
pub struct StatusReport {
    pub entries: Vec<ProviderStatus>,
}

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, venue: Venue, record_count: usize) {
        self.entries.push(ProviderStatus {
            venue,
            outcome: FetchOutcome::Success,
            record_count,
        });
    }

    pub fn record_failure(&mut self, venue: Venue, cause: FailureCause) {
        self.entries.push(ProviderStatus {
            venue,
            outcome: FetchOutcome::Failed(cause),
            record_count: 0,
        });
    }

    pub fn record_not_configured(&mut self, venue: Venue) {
        self.entries.push(ProviderStatus {
            venue,
            outcome: FetchOutcome::NotConfigured,
            record_count: 0,
        });
    }

    pub fn has_success(&self) -> bool {
        self.entries
            .iter()
            .any(|s| s.outcome == FetchOutcome::Success)
    }

    /// All failed entries with their causes.
    pub fn failures(&self) -> Vec<(Venue, &FailureCause)> {
        self.entries
            .iter()
            .filter_map(|s| match &s.outcome {
                FetchOutcome::Failed(cause) => Some((s.venue, cause)),
                _ => None,
            })
            .collect()
    }

    pub fn outcome_for(&self, venue: Venue) -> Option<&FetchOutcome> {
        self.entries
            .iter()
            .find(|s| s.venue == venue)
            .map(|s| &s.outcome)
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|s| match &s.outcome {
                FetchOutcome::Success => format!("{}: OK ({})", s.venue, s.record_count),
                FetchOutcome::Failed(cause) => format!("{}: FAILED ({cause})", s.venue),
                FetchOutcome::NotConfigured => format!("{}: NOT_CONFIGURED", s.venue),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// Result of one aggregation round. An empty record set alongside a report
/// full of failures is a valid response; the caller decides whether that
/// is actionable.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub records: Vec<NormalizedRecord>,
    pub status: StatusReport,
}
