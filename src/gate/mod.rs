//! Mode gate: which providers may participate under the current mode.
//!
//! Gating runs once per snapshot, before any rate-limit or network
//! activity, so ineligible providers never consume quota or dispatch
//! slots. The decision is a pure function of descriptor and mode.

use crate::models::{OperatingMode, ProviderDescriptor};

/// Outcome of the eligibility check for one provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    /// Provider may be dispatched this round.
    Eligible,
    /// Provider sits out: no credential (live), or no public data path and
    /// no usable simulation credential (simulation). A normal state.
    NotConfigured,
}

/// Decide whether a provider participates under the given mode.
pub fn eligible(descriptor: &ProviderDescriptor, mode: OperatingMode) -> Eligibility {
    let allowed = match mode {
        OperatingMode::Simulation => {
            !descriptor.requires_auth
                || (descriptor.supports_simulation && descriptor.has_credential())
        }
        // Live mode is strictly credentialed: even venues with a public
        // data path sit out until the host configures a credential.
        OperatingMode::Live => descriptor.has_credential(),
    };

    if allowed {
        Eligibility::Eligible
    } else {
        Eligibility::NotConfigured
    }
}
