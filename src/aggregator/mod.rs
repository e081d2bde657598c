//! The orchestrator: one snapshot per call across all eligible providers.
//!
//! Control flow per snapshot: mode gate -> rate limiter -> concurrent
//! fetch -> merge. Every configured provider ends up with exactly one
//! entry in the status report, whether it fetched, failed, was denied by
//! the limiter, or sat out for lack of a credential.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use log::{debug, info, warn};

use crate::errors::{AggregatorError, FailureCause};
use crate::gate::{self, Eligibility};
use crate::limiter::RateLimiter;
use crate::models::{
    NormalizedRecord, OperatingMode, ProviderDescriptor, RecordKey, Snapshot, StatusReport,
};
use crate::provider::{FetchContext, VenueAdapter};

/// One provider wired into the aggregator: its static descriptor plus the
/// adapter that speaks the venue's protocol.
pub struct ConfiguredProvider {
    pub descriptor: ProviderDescriptor,
    pub adapter: Arc<dyn VenueAdapter>,
}

/// Drives concurrent fetches across eligible providers and merges the
/// results into one normalized snapshot.
///
/// The operating mode is fixed at construction; there is no way to switch
/// an aggregator between simulation and live mid-lifetime.
pub struct Aggregator {
    mode: OperatingMode,
    providers: Vec<ConfiguredProvider>,
    limiter: RateLimiter,
}

impl Aggregator {
    /// Build an aggregator from resolved provider configuration.
    ///
    /// Descriptors arrive with credentials already resolved by the host;
    /// no lookup happens here. The rate limiter is seeded with each
    /// descriptor's policy.
    pub fn new(mode: OperatingMode, providers: Vec<ConfiguredProvider>) -> Self {
        let limiter = RateLimiter::new();
        for provider in &providers {
            if provider.adapter.venue() != provider.descriptor.venue {
                warn!(
                    "descriptor for {} wired to an adapter for {}",
                    provider.descriptor.venue,
                    provider.adapter.venue()
                );
            }
            limiter.configure(provider.descriptor.venue, provider.descriptor.rate_limit);
        }

        Self {
            mode,
            providers,
            limiter,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Assemble one snapshot within the given time budget.
    ///
    /// Per-provider failures never fail the call; they land in the status
    /// report. The only hard error is caller misuse (an empty budget).
    /// An `Ok` with zero records and a report full of failures is a valid
    /// response.
    pub async fn get_snapshot(&self, budget: Duration) -> Result<Snapshot, AggregatorError> {
        if budget.is_zero() {
            return Err(AggregatorError::InvalidDeadline {
                reason: "zero time budget".to_string(),
            });
        }

        let deadline = Instant::now() + budget;
        let mut report = StatusReport::new();

        // Gate and rate-limit before any network activity. Ineligible
        // providers never touch the limiter; denied providers never reach
        // their adapter.
        let mut dispatched = Vec::new();
        for provider in &self.providers {
            let venue = provider.descriptor.venue;
            match gate::eligible(&provider.descriptor, self.mode) {
                Eligibility::NotConfigured => {
                    debug!("{venue}: not configured under {} mode", self.mode);
                    report.record_not_configured(venue);
                }
                Eligibility::Eligible => {
                    if self.limiter.allow(venue) {
                        let ctx =
                            FetchContext::new(deadline, provider.descriptor.credential.clone());
                        dispatched.push((venue, Arc::clone(&provider.adapter), ctx));
                    } else {
                        debug!("{venue}: denied by rate limiter");
                        report.record_failure(venue, FailureCause::RateLimited);
                    }
                }
            }
        }

        // Concurrent fetch, each bound by the snapshot deadline. A hung
        // adapter is abandoned by the timeout wrapper; its future is
        // dropped, which is the cooperative cancellation contract.
        let fetches = dispatched.into_iter().map(|(venue, adapter, ctx)| async move {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let outcome = match tokio::time::timeout(remaining, adapter.fetch(&ctx)).await {
                Ok(result) => result,
                Err(_) => Err(FailureCause::Timeout),
            };
            (venue, outcome)
        });
        let completions = join_all(fetches).await;

        // Merge keyed by (venue, market id, observation time). Records
        // from different venues never collide; a duplicate key within one
        // venue keeps the first record rather than silently overwriting.
        let mut merged: HashMap<RecordKey, NormalizedRecord> = HashMap::new();
        for (venue, outcome) in completions {
            match outcome {
                Ok(records) => {
                    let mut contributed = 0usize;
                    for record in records {
                        if record.market_id.trim().is_empty() {
                            warn!("{venue}: dropping record with empty market id");
                            continue;
                        }
                        let key = record.key();
                        if merged.contains_key(&key) {
                            warn!("{venue}: duplicate record for {}, keeping first", key.market_id);
                            continue;
                        }
                        merged.insert(key, record);
                        contributed += 1;
                    }
                    report.record_success(venue, contributed);
                }
                Err(cause) => {
                    debug!("{venue}: fetch failed: {cause}");
                    report.record_failure(venue, cause);
                }
            }
        }

        info!("snapshot assembled: {}", report.summary());

        Ok(Snapshot {
            records: merged.into_values().collect(),
            status: report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Credential, FetchOutcome, RateLimitPolicy, Venue};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum MockBehavior {
        Records(Vec<NormalizedRecord>),
        Fail(FailureCause),
        Hang,
    }

    struct MockAdapter {
        venue: Venue,
        behavior: MockBehavior,
        calls: AtomicUsize,
    }

    impl MockAdapter {
        fn new(venue: Venue, behavior: MockBehavior) -> Arc<Self> {
            Arc::new(Self {
                venue,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VenueAdapter for MockAdapter {
        fn venue(&self) -> Venue {
            self.venue
        }

        async fn fetch(
            &self,
            _ctx: &FetchContext,
        ) -> Result<Vec<NormalizedRecord>, FailureCause> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                MockBehavior::Records(records) => Ok(records.clone()),
                MockBehavior::Fail(cause) => Err(cause.clone()),
                MockBehavior::Hang => {
                    futures::future::pending::<()>().await;
                    unreachable!("pending future never resolves")
                }
            }
        }
    }

    fn record(venue: Venue, market_id: &str) -> NormalizedRecord {
        let at = Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap();
        let mut rec = NormalizedRecord::new(venue, market_id, at);
        rec.price = Some(dec!(0.5));
        rec
    }

    fn configured(
        descriptor: ProviderDescriptor,
        adapter: Arc<MockAdapter>,
    ) -> ConfiguredProvider {
        ConfiguredProvider {
            descriptor,
            adapter,
        }
    }

    const BUDGET: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_one_status_entry_per_configured_provider() {
        let a = MockAdapter::new(
            Venue::Polymarket,
            MockBehavior::Records(vec![record(Venue::Polymarket, "m1")]),
        );
        let b = MockAdapter::new(Venue::Alpaca, MockBehavior::Hang);
        let c = MockAdapter::new(
            Venue::Binance,
            MockBehavior::Fail(FailureCause::VenueError {
                message: "http status 503".to_string(),
            }),
        );

        let aggregator = Aggregator::new(
            OperatingMode::Simulation,
            vec![
                configured(ProviderDescriptor::public(Venue::Polymarket), a),
                // No credential: sits out of this round entirely.
                configured(ProviderDescriptor::authenticated(Venue::Alpaca, None), b),
                configured(ProviderDescriptor::public(Venue::Binance), c),
            ],
        );

        let snapshot = aggregator.get_snapshot(BUDGET).await.unwrap();
        assert_eq!(snapshot.status.entries.len(), 3);
    }

    #[tokio::test]
    async fn test_simulation_gating_scenario() {
        // Provider A public, provider B requires auth with no credential.
        let a = MockAdapter::new(
            Venue::Polymarket,
            MockBehavior::Records(vec![record(Venue::Polymarket, "m1")]),
        );
        let b = MockAdapter::new(Venue::Alpaca, MockBehavior::Records(vec![]));

        let aggregator = Aggregator::new(
            OperatingMode::Simulation,
            vec![
                configured(ProviderDescriptor::public(Venue::Polymarket), Arc::clone(&a)),
                configured(
                    ProviderDescriptor::authenticated(Venue::Alpaca, None),
                    Arc::clone(&b),
                ),
            ],
        );

        let snapshot = aggregator.get_snapshot(BUDGET).await.unwrap();

        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 0);
        assert_eq!(
            snapshot.status.outcome_for(Venue::Polymarket),
            Some(&FetchOutcome::Success)
        );
        assert_eq!(
            snapshot.status.outcome_for(Venue::Alpaca),
            Some(&FetchOutcome::NotConfigured)
        );
    }

    #[tokio::test]
    async fn test_live_venue_error_scenario() {
        // A returns 3 records; B's credential is present but the venue
        // errors. The snapshot keeps A's records and reports both.
        let a = MockAdapter::new(
            Venue::Alpaca,
            MockBehavior::Records(vec![
                record(Venue::Alpaca, "AAPL"),
                record(Venue::Alpaca, "MSFT"),
                record(Venue::Alpaca, "NVDA"),
            ]),
        );
        let b = MockAdapter::new(
            Venue::Binance,
            MockBehavior::Fail(FailureCause::VenueError {
                message: "http status 500".to_string(),
            }),
        );

        let aggregator = Aggregator::new(
            OperatingMode::Live,
            vec![
                configured(
                    ProviderDescriptor::authenticated(
                        Venue::Alpaca,
                        Some(Credential::new("key:secret")),
                    ),
                    a,
                ),
                configured(
                    ProviderDescriptor::authenticated(
                        Venue::Binance,
                        Some(Credential::new("token")),
                    ),
                    b,
                ),
            ],
        );

        let snapshot = aggregator.get_snapshot(BUDGET).await.unwrap();

        assert_eq!(snapshot.records.len(), 3);
        let alpaca = snapshot
            .status
            .entries
            .iter()
            .find(|s| s.venue == Venue::Alpaca)
            .unwrap();
        assert_eq!(alpaca.outcome, FetchOutcome::Success);
        assert_eq!(alpaca.record_count, 3);
        assert_eq!(
            snapshot.status.outcome_for(Venue::Binance),
            Some(&FetchOutcome::Failed(FailureCause::VenueError {
                message: "http status 500".to_string()
            }))
        );
    }

    #[tokio::test]
    async fn test_rate_limited_second_snapshot_makes_no_call() {
        let a = MockAdapter::new(
            Venue::Polymarket,
            MockBehavior::Records(vec![record(Venue::Polymarket, "m1")]),
        );

        let descriptor = ProviderDescriptor::public(Venue::Polymarket).with_rate_limit(
            RateLimitPolicy {
                max_calls: 1,
                window: Duration::from_secs(60),
            },
        );
        let aggregator = Aggregator::new(
            OperatingMode::Simulation,
            vec![configured(descriptor, Arc::clone(&a))],
        );

        let first = aggregator.get_snapshot(BUDGET).await.unwrap();
        assert_eq!(
            first.status.outcome_for(Venue::Polymarket),
            Some(&FetchOutcome::Success)
        );

        let second = aggregator.get_snapshot(BUDGET).await.unwrap();
        assert_eq!(
            second.status.outcome_for(Venue::Polymarket),
            Some(&FetchOutcome::Failed(FailureCause::RateLimited))
        );
        assert_eq!(a.call_count(), 1);
    }

    #[tokio::test]
    async fn test_ineligible_provider_consumes_no_quota() {
        let b = MockAdapter::new(Venue::Alpaca, MockBehavior::Records(vec![]));
        let descriptor = ProviderDescriptor::authenticated(Venue::Alpaca, None).with_rate_limit(
            RateLimitPolicy {
                max_calls: 5,
                window: Duration::from_secs(60),
            },
        );
        let aggregator =
            Aggregator::new(OperatingMode::Simulation, vec![configured(descriptor, b)]);

        aggregator.get_snapshot(BUDGET).await.unwrap();
        assert_eq!(aggregator.limiter.remaining(Venue::Alpaca), 5);
    }

    #[tokio::test]
    async fn test_hung_adapter_is_abandoned_at_deadline() {
        let hung = MockAdapter::new(Venue::Binance, MockBehavior::Hang);
        let healthy = MockAdapter::new(
            Venue::Polymarket,
            MockBehavior::Records(vec![record(Venue::Polymarket, "m1")]),
        );

        let aggregator = Aggregator::new(
            OperatingMode::Simulation,
            vec![
                configured(ProviderDescriptor::public(Venue::Binance), hung),
                configured(ProviderDescriptor::public(Venue::Polymarket), healthy),
            ],
        );

        let budget = Duration::from_millis(100);
        // Allow generous scheduling slack beyond the deadline itself.
        let grace = Duration::from_millis(500);

        let started = Instant::now();
        let snapshot = aggregator.get_snapshot(budget).await.unwrap();
        assert!(started.elapsed() < budget + grace);

        assert_eq!(
            snapshot.status.outcome_for(Venue::Binance),
            Some(&FetchOutcome::Failed(FailureCause::Timeout))
        );
        assert_eq!(
            snapshot.status.outcome_for(Venue::Polymarket),
            Some(&FetchOutcome::Success)
        );
        assert_eq!(snapshot.records.len(), 1);
    }

    #[tokio::test]
    async fn test_same_symbol_across_venues_is_not_merged_away() {
        let a = MockAdapter::new(
            Venue::Alpaca,
            MockBehavior::Records(vec![record(Venue::Alpaca, "COIN")]),
        );
        let b = MockAdapter::new(
            Venue::Binance,
            MockBehavior::Records(vec![record(Venue::Binance, "COIN")]),
        );

        let aggregator = Aggregator::new(
            OperatingMode::Live,
            vec![
                configured(
                    ProviderDescriptor::authenticated(
                        Venue::Alpaca,
                        Some(Credential::new("key:secret")),
                    ),
                    a,
                ),
                configured(
                    ProviderDescriptor::authenticated(
                        Venue::Binance,
                        Some(Credential::new("token")),
                    ),
                    b,
                ),
            ],
        );

        let snapshot = aggregator.get_snapshot(BUDGET).await.unwrap();
        assert_eq!(snapshot.records.len(), 2);

        let venues: Vec<Venue> = snapshot.records.iter().map(|r| r.venue).collect();
        assert!(venues.contains(&Venue::Alpaca));
        assert!(venues.contains(&Venue::Binance));
    }

    #[tokio::test]
    async fn test_duplicate_key_keeps_first_record() {
        let mut first = record(Venue::Polymarket, "dup");
        first.price = Some(dec!(0.6));
        let second = record(Venue::Polymarket, "dup");

        let a = MockAdapter::new(
            Venue::Polymarket,
            MockBehavior::Records(vec![first, second]),
        );
        let aggregator = Aggregator::new(
            OperatingMode::Simulation,
            vec![configured(ProviderDescriptor::public(Venue::Polymarket), a)],
        );

        let snapshot = aggregator.get_snapshot(BUDGET).await.unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].price, Some(dec!(0.6)));

        let status = &snapshot.status.entries[0];
        assert_eq!(status.outcome, FetchOutcome::Success);
        assert_eq!(status.record_count, 1);
    }

    #[tokio::test]
    async fn test_records_with_empty_market_id_are_dropped() {
        let a = MockAdapter::new(
            Venue::Polymarket,
            MockBehavior::Records(vec![record(Venue::Polymarket, " ")]),
        );
        let aggregator = Aggregator::new(
            OperatingMode::Simulation,
            vec![configured(ProviderDescriptor::public(Venue::Polymarket), a)],
        );

        let snapshot = aggregator.get_snapshot(BUDGET).await.unwrap();
        assert!(snapshot.records.is_empty());
        assert_eq!(snapshot.status.entries[0].record_count, 0);
    }

    #[tokio::test]
    async fn test_zero_budget_is_a_hard_error() {
        let aggregator = Aggregator::new(OperatingMode::Simulation, vec![]);
        let err = aggregator.get_snapshot(Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, AggregatorError::InvalidDeadline { .. }));
    }

    #[tokio::test]
    async fn test_all_failures_is_still_a_valid_snapshot() {
        let a = MockAdapter::new(
            Venue::Polymarket,
            MockBehavior::Fail(FailureCause::SchemaMismatch {
                detail: "unusable payload".to_string(),
            }),
        );
        let aggregator = Aggregator::new(
            OperatingMode::Simulation,
            vec![configured(ProviderDescriptor::public(Venue::Polymarket), a)],
        );

        let snapshot = aggregator.get_snapshot(BUDGET).await.unwrap();
        assert!(snapshot.records.is_empty());
        assert!(!snapshot.status.has_success());
        assert_eq!(snapshot.status.failures().len(), 1);
    }
}
