//! Venue adapters.
//!
//! One adapter per venue; each wraps that venue's fetch logic behind the
//! uniform [`VenueAdapter`] capability. The orchestrator only ever calls
//! `fetch` and never branches on venue identity.

mod traits;

pub mod alpaca;
pub mod binance;
pub mod polymarket;

pub use traits::{FetchContext, VenueAdapter};
