use std::fmt;

/// Operating mode of one aggregator instance.
///
/// Fixed at construction and immutable for the aggregator's lifetime, so
/// eligibility decisions cannot race with in-flight fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatingMode {
    /// Public / paper data only; authenticated providers participate only
    /// when they explicitly support simulation and carry a credential.
    Simulation,
    /// Authenticated operation; providers without credentials sit out.
    Live,
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingMode::Simulation => f.write_str("simulation"),
            OperatingMode::Live => f.write_str("live"),
        }
    }
}
