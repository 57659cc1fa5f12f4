use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Logical point in time, in whole seconds since the UNIX epoch.
///
/// Commit deadlines are stored as absolute timestamps so that a later change
/// to an admin's commit window never alters a pledge already in flight.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch.
    pub const ZERO: Self = Self(0);

    /// Create from seconds since the epoch.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Seconds since the epoch.
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Add a window, saturating at the far future instead of wrapping.
    pub fn saturating_add(self, window: Duration) -> Self {
        Self(self.0.saturating_add(window.as_secs()))
    }

    /// Returns `true` once `self` has reached `deadline`.
    pub fn has_reached(self, deadline: Timestamp) -> bool {
        self >= deadline
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

/// Source of the current logical time.
///
/// Nothing in the ledger fires on a timer; deadlines are compared against
/// `now()` whenever an operation touches a pledge.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Timestamp(secs)
    }
}

/// Manually driven clock for tests, demos, and scenario replay.
///
/// Clones share the same underlying time, so a handle kept by a test can
/// advance the clock seen by the ledger.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    secs: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock starting at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(start.as_secs())),
        }
    }

    /// Jump to an absolute time. Moving backwards is allowed for tests.
    pub fn set(&self, to: Timestamp) {
        self.secs.store(to.as_secs(), Ordering::SeqCst);
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.secs.fetch_add(by.as_secs(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.secs.load(Ordering::SeqCst))
    }
}
