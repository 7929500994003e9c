//! Sparse snapshot cache over the event log.
//!
//! Positions are `applied` counts: the number of mutation events folded
//! into the stored state. `applied = 0` is the origin state produced by the
//! create event alone.

use hindsight_core::{HistoryError, HistoryResult};

#[derive(Debug, Clone)]
struct MemoEntry<S> {
    applied: usize,
    state: S,
}

/// Strictly-increasing sequence of cached snapshots.
///
/// Never empty: the origin entry is installed at construction and survives
/// every eviction.
#[derive(Debug, Clone)]
pub struct MemoStore<S> {
    entries: Vec<MemoEntry<S>>,
}

impl<S> MemoStore<S> {
    /// Create a store holding only the origin state.
    pub fn with_origin(state: S) -> Self {
        Self {
            entries: vec![MemoEntry { applied: 0, state }],
        }
    }

    /// Position of the most recently cached snapshot.
    pub fn last_applied(&self) -> usize {
        self.entries.last().map_or(0, |entry| entry.applied)
    }

    /// Append a snapshot.
    ///
    /// `applied` must strictly exceed every position already stored. A
    /// violation means insertion/eviction bookkeeping is broken and is
    /// reported rather than ignored.
    pub fn push(&mut self, applied: usize, state: S) -> HistoryResult<()> {
        let last_applied = self.last_applied();
        if applied <= last_applied {
            return Err(HistoryError::MemoOrderViolation {
                last_applied,
                attempted: applied,
            });
        }
        self.entries.push(MemoEntry { applied, state });
        Ok(())
    }

    /// Snapshot with the greatest position at or before `applied`.
    ///
    /// Always succeeds thanks to the origin entry.
    pub fn nearest_at_or_before(&self, applied: usize) -> (usize, &S) {
        let mut lo = 0;
        let mut hi = self.entries.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.entries[mid].applied <= applied {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        let entry = &self.entries[lo - 1];
        (entry.applied, &entry.state)
    }

    /// Drop every snapshot at or beyond `applied`.
    ///
    /// The origin entry is kept even if `applied` is zero.
    pub fn evict_from(&mut self, applied: usize) -> usize {
        let applied = applied.max(1);
        let mut evicted = 0;
        while self.entries.last().is_some_and(|entry| entry.applied >= applied) {
            self.entries.pop();
            evicted += 1;
        }
        evicted
    }

    /// Cached positions in increasing order.
    #[cfg(test)]
    pub fn positions(&self) -> Vec<usize> {
        self.entries.iter().map(|entry| entry.applied).collect()
    }
}
