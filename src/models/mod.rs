mod credential;
mod descriptor;
mod mode;
mod outcome;
mod record;
mod venue;

pub use credential::Credential;
pub use descriptor::{ProviderDescriptor, RateLimitPolicy};
pub use mode::OperatingMode;
pub use outcome::{FetchOutcome, ProviderStatus, Snapshot, StatusReport};
pub use record::{NormalizedRecord, RecordKey};
pub use venue::Venue;
