//! Failure lockout — throttles repeated wrong-passphrase attempts.
//!
//! The guard sits in front of every vault operation.  Each decryption
//! failure reported by a lookup bumps a counter; at `max_fails` the
//! guard freezes for `freeze` and refuses everything until the freeze
//! expires.  Expiry is tied to the moment the freeze was engaged:
//! attempts during the window are refused before they can count, so
//! the window can be neither extended nor shortened.
//!
//! ```text
//!            failure (count < max)        success
//!          ┌──────────────────────┐   ┌──────────────┐
//!          ▼                      │   ▼              │
//!       ┌──────┐  count == max  ┌─┴────┐             │
//!  ───► │ OPEN │ ─────────────► │FROZEN│ ── now >= freeze_until ──► OPEN (count = 0)
//!       └──────┘                └──────┘
//! ```

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, UpassError};

/// Consecutive failures allowed before freezing.
pub const DEFAULT_MAX_FAILS: u32 = 5;

/// Freeze length in seconds.
pub const DEFAULT_FREEZE_SECS: u64 = 60;

/// Longest freeze a policy may ask for: one day.
pub const MAX_FREEZE_SECS: u64 = 86_400;

/// Tunables for the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_fails: u32,
    pub freeze_secs: u64,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_fails: DEFAULT_MAX_FAILS,
            freeze_secs: DEFAULT_FREEZE_SECS,
        }
    }
}

impl LockoutPolicy {
    fn freeze(&self) -> Duration {
        let secs = self.freeze_secs.min(MAX_FREEZE_SECS);
        Duration::try_seconds(i64::try_from(secs).unwrap_or(0)).unwrap_or_else(Duration::zero)
    }

    /// When a freeze engaged at `now` ends.
    fn freeze_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.freeze())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Raw guard state.  Serializable so one-shot CLI runs can carry it
/// between invocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    #[serde(default)]
    pub fail_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_until: Option<DateTime<Utc>>,
}

/// What the guard currently allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutStatus {
    Open { fail_count: u32 },
    Frozen { seconds_remaining: u64 },
}

/// The lockout state machine.  Owned by whoever dispatches operations.
#[derive(Debug)]
pub struct LockoutGuard<C = SystemClock> {
    policy: LockoutPolicy,
    clock: C,
    state: LockoutState,
}

impl LockoutGuard<SystemClock> {
    /// A guard on the wall clock.
    pub fn new(policy: LockoutPolicy) -> Self {
        Self::with_clock(policy, SystemClock)
    }
}

impl<C: Clock> LockoutGuard<C> {
    /// A guard reading time from `clock`.
    pub fn with_clock(policy: LockoutPolicy, clock: C) -> Self {
        Self::restore(policy, clock, LockoutState::default())
    }

    /// Resume from a previously saved `state`.
    ///
    /// A saved freeze longer than the current policy allows is clamped,
    /// so a tampered state file cannot lock the vault indefinitely.
    /// `freeze_secs` is capped at `MAX_FREEZE_SECS`.
    pub fn restore(policy: LockoutPolicy, clock: C, mut state: LockoutState) -> Self {
        let policy = LockoutPolicy {
            max_fails: policy.max_fails.max(1),
            freeze_secs: policy.freeze_secs.min(MAX_FREEZE_SECS),
        };
        let latest = policy.freeze_end(clock.now());
        if let Some(until) = state.freeze_until {
            if until > latest {
                state.freeze_until = Some(latest);
            }
        }
        Self {
            policy,
            clock,
            state,
        }
    }

    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Snapshot of the state, after expiring any elapsed freeze.
    pub fn state(&mut self) -> LockoutState {
        self.expire(self.clock.now());
        self.state
    }

    /// Current status, after expiring any elapsed freeze.
    pub fn status(&mut self) -> LockoutStatus {
        let now = self.clock.now();
        self.expire(now);
        match self.state.freeze_until {
            Some(until) => LockoutStatus::Frozen {
                seconds_remaining: seconds_until(now, until),
            },
            None => LockoutStatus::Open {
                fail_count: self.state.fail_count,
            },
        }
    }

    /// Refuse with `Frozen` while a freeze is active.  No side effects
    /// on the failure count.
    pub fn check(&mut self) -> Result<()> {
        match self.status() {
            LockoutStatus::Frozen { seconds_remaining } => {
                tracing::debug!(seconds_remaining, "operation refused, vault frozen");
                Err(UpassError::Frozen { seconds_remaining })
            }
            LockoutStatus::Open { .. } => Ok(()),
        }
    }

    /// Count one wrong-passphrase signal.  Returns the resulting status.
    ///
    /// Ignored while frozen.
    pub fn record_failure(&mut self) -> LockoutStatus {
        let now = self.clock.now();
        self.expire(now);
        if self.state.freeze_until.is_some() {
            return self.status();
        }

        self.state.fail_count += 1;
        if self.state.fail_count >= self.policy.max_fails {
            self.state.freeze_until = Some(self.policy.freeze_end(now));
            tracing::warn!(
                fail_count = self.state.fail_count,
                freeze_secs = self.policy.freeze_secs,
                "too many failed attempts, freezing vault"
            );
        } else {
            tracing::debug!(fail_count = self.state.fail_count, "decryption failure recorded");
        }
        self.status()
    }

    /// Reset the failure count after a successful operation.
    ///
    /// Ignored while frozen.
    pub fn record_success(&mut self) {
        self.expire(self.clock.now());
        if self.state.freeze_until.is_none() {
            self.state.fail_count = 0;
        }
    }

    fn expire(&mut self, now: DateTime<Utc>) {
        if let Some(until) = self.state.freeze_until {
            if now >= until {
                tracing::info!("lockout expired");
                self.state = LockoutState::default();
            }
        }
    }
}

/// Whole seconds left until `until`, rounded up, at least 1.
fn seconds_until(now: DateTime<Utc>, until: DateTime<Utc>) -> u64 {
    let millis = (until - now).num_milliseconds().max(1);
    let millis = u64::try_from(millis).unwrap_or(1);
    millis.div_ceil(1000)
}
