use std::time::Duration;

use super::credential::Credential;
use super::venue::Venue;

/// Rolling-window rate limit for one provider.
#[derive(Clone, Copy, Debug)]
pub struct RateLimitPolicy {
    /// Maximum fetch dispatches inside one window.
    pub max_calls: u32,
    /// Length of the rolling window.
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_calls: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// Static per-provider configuration, built once from resolved
/// configuration and credentials at aggregator construction.
#[derive(Clone, Debug)]
pub struct ProviderDescriptor {
    pub venue: Venue,
    /// Provider has no public data path; a credential is mandatory in
    /// every mode.
    pub requires_auth: bool,
    /// Authenticated provider that can still participate in simulation
    /// mode (e.g. a broker with paper keys).
    pub supports_simulation: bool,
    pub rate_limit: RateLimitPolicy,
    /// Resolved credential bundle, or `None` when the host has none
    /// configured. "Not connected" is a normal state, not an error.
    pub credential: Option<Credential>,
}

impl ProviderDescriptor {
    /// Descriptor for a venue with public data and no credential.
    pub fn public(venue: Venue) -> Self {
        Self {
            venue,
            requires_auth: false,
            supports_simulation: true,
            rate_limit: RateLimitPolicy::default(),
            credential: None,
        }
    }

    /// Descriptor for an authenticated venue.
    pub fn authenticated(venue: Venue, credential: Option<Credential>) -> Self {
        Self {
            venue,
            requires_auth: true,
            supports_simulation: false,
            rate_limit: RateLimitPolicy::default(),
            credential,
        }
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitPolicy) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_simulation_support(mut self, supported: bool) -> Self {
        self.supports_simulation = supported;
        self
    }

    /// True when a non-empty credential is configured.
    pub fn has_credential(&self) -> bool {
        self.credential.as_ref().is_some_and(|c| !c.is_empty())
    }
}
