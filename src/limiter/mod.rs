//! Sliding-window rate limiter, one window per provider.
//!
//! Quota is consumed at dispatch time: an admitted call records its
//! timestamp immediately, so slow or hanging fetches cannot be used to
//! exceed the limit with concurrent retries. Denial never consumes quota.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use log::{debug, warn};

use crate::models::{RateLimitPolicy, Venue};

/// Dispatch timestamps inside the current window for a single provider.
#[derive(Debug)]
struct SlidingWindow {
    policy: RateLimitPolicy,
    stamps: VecDeque<Instant>,
}

impl SlidingWindow {
    fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            stamps: VecDeque::with_capacity(policy.max_calls as usize),
        }
    }

    /// Drop timestamps that have slid out of the window.
    ///
    /// A stamp exactly `window` old still counts against the caller, so a
    /// call landing exactly on the boundary is denied rather than allowed.
    fn evict(&mut self, now: Instant) {
        while let Some(oldest) = self.stamps.front() {
            if now.duration_since(*oldest) > self.policy.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn try_admit(&mut self, now: Instant) -> bool {
        self.evict(now);

        if (self.stamps.len() as u32) < self.policy.max_calls {
            self.stamps.push_back(now);
            true
        } else {
            false
        }
    }

    fn remaining(&mut self, now: Instant) -> u32 {
        self.evict(now);
        self.policy.max_calls.saturating_sub(self.stamps.len() as u32)
    }
}

/// Per-provider rate limiter shared by all in-flight fetch attempts.
///
/// Each provider's window is independent; one provider exhausting its
/// budget never throttles another. Windows are created on demand with
/// default policy, or pre-configured via [`RateLimiter::configure`].
pub struct RateLimiter {
    windows: Mutex<HashMap<Venue, SlidingWindow>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the windows mutex, recovering from poison if necessary.
    ///
    /// Worst case after recovery is slightly off accounting for one
    /// window, which beats panicking mid-snapshot.
    fn lock_windows(&self) -> MutexGuard<'_, HashMap<Venue, SlidingWindow>> {
        self.windows.lock().unwrap_or_else(|poisoned| {
            warn!("rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Install (or replace) the policy for one provider. Resets any
    /// accumulated window state for that provider.
    pub fn configure(&self, venue: Venue, policy: RateLimitPolicy) {
        let mut windows = self.lock_windows();
        windows.insert(venue, SlidingWindow::new(policy));
    }

    /// Decide, without blocking, whether a call may fire right now.
    ///
    /// Admission consumes one unit of quota at this moment; denial
    /// consumes nothing.
    pub fn allow(&self, venue: Venue) -> bool {
        let now = Instant::now();
        let mut windows = self.lock_windows();

        let window = windows
            .entry(venue)
            .or_insert_with(|| SlidingWindow::new(RateLimitPolicy::default()));

        let admitted = window.try_admit(now);
        if admitted {
            debug!("rate limiter: admitted dispatch for {venue}");
        } else {
            debug!("rate limiter: denied {venue}, window exhausted");
        }
        admitted
    }

    /// How many dispatches the provider has left in the current window.
    pub fn remaining(&self, venue: Venue) -> u32 {
        let now = Instant::now();
        let mut windows = self.lock_windows();

        match windows.get_mut(&venue) {
            Some(window) => window.remaining(now),
            None => RateLimitPolicy::default().max_calls,
        }
    }

    /// Clear accumulated state for one provider, keeping its policy.
    pub fn reset(&self, venue: Venue) {
        let mut windows = self.lock_windows();
        if let Some(window) = windows.get_mut(&venue) {
            window.stamps.clear();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
