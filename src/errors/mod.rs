//! Failure taxonomy for the aggregator.
//!
//! Two layers of failure exist and they never mix:
//! - [`FailureCause`]: a per-provider fetch failure. These are *data*,
//!   carried in the snapshot's status report, and never abort a snapshot.
//! - [`AggregatorError`]: a hard failure of `get_snapshot` itself, caused
//!   by caller misuse rather than by any venue.

use thiserror::Error;

use crate::models::Venue;

/// Why a single provider's fetch produced no records.
///
/// Adapters must map every venue-specific error (HTTP status, malformed
/// payload, connection failure) into one of these variants; no venue error
/// type crosses the adapter boundary.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FailureCause {
    /// The provider's rate-limit window is exhausted. Recoverable once the
    /// window slides.
    #[error("rate limited")]
    RateLimited,

    /// The operating mode requires a credential the provider does not have,
    /// or the venue rejected the credential. Permanent until reconfigured.
    #[error("auth missing or rejected")]
    AuthMissing,

    /// The fetch did not complete before its deadline. Transient.
    #[error("timed out")]
    Timeout,

    /// The venue answered with an error. Treated as transient by default.
    #[error("venue error: {message}")]
    VenueError { message: String },

    /// The venue answered, but nothing in the payload could be normalized.
    /// A bug signal, not a retryable condition.
    #[error("schema mismatch: {detail}")]
    SchemaMismatch { detail: String },
}

impl FailureCause {
    /// Classify a non-success HTTP status from a venue.
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => Self::AuthMissing,
            429 => Self::RateLimited,
            code => Self::VenueError {
                message: format!("http status {code}"),
            },
        }
    }

    /// Classify a transport-level error from `reqwest`.
    ///
    /// Timeouts keep their identity; everything else (DNS, connect, TLS,
    /// body read) collapses into [`FailureCause::VenueError`].
    pub fn from_transport(venue: Venue, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::from_status(status)
        } else {
            Self::VenueError {
                message: format!("{venue}: {err}"),
            }
        }
    }
}

/// Hard failures of a snapshot call.
///
/// Provider failures never surface here; they land in the status report.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// The caller passed a deadline budget that cannot admit any fetch.
    #[error("invalid snapshot deadline: {reason}")]
    InvalidDeadline { reason: String },
}
