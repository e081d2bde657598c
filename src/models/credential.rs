use std::fmt;
use std::sync::Arc;

/// An already-resolved credential bundle for one provider.
///
/// The aggregator never performs credential lookup; whatever secret store
/// the host uses hands the resolved value in at construction. The value is
/// opaque here: adapters decide how to split it (e.g. `key:secret` pairs).
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: Arc<str>,
}

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Arc::from(value.into()),
        }
    }

    /// A present-but-empty credential counts as not configured.
    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Access the secret material. Only adapters should call this.
    pub fn expose(&self) -> &str {
        &self.value
    }
}

// Never let secret material leak through Debug formatting of contexts or
// descriptors.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
