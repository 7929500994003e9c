//! Event time for ordering the log.
//!
//! Timestamps are supplied by callers (typically wall-clock milliseconds
//! stamped by whoever produced the event). The engine only requires a total
//! order; values are not required to be unique.

use serde::{Deserialize, Serialize};

/// Logical timestamp attached to every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventTime(u64);

impl EventTime {
    /// The earliest representable time
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create from a raw millisecond value
    #[must_use]
    pub const fn from_millis(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw millisecond value
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl Default for EventTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for EventTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl From<u64> for EventTime {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
