//! Timestamp-ordered event log with retroactive insertion.

use crate::event::Event;
use hindsight_core::EventTime;

/// Mutation events kept sorted non-decreasingly by timestamp.
///
/// Equal timestamps keep their relative insertion order, and every new
/// insert lands after the existing run of equal timestamps. That gives a
/// single reproducible order for out-of-order arrivals.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create an empty log
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Build a log from events in any arrival order.
    ///
    /// The sort is stable, so equal-timestamp events keep the order they
    /// appeared in `events`.
    #[must_use]
    pub fn from_events(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|event| event.timestamp);
        Self { events }
    }

    /// Insert an event at its sorted position and return that position.
    ///
    /// All later events shift one index to the right.
    pub fn insert(&mut self, event: Event) -> usize {
        let at = self.upper_bound(event.timestamp);
        self.events.insert(at, event);
        at
    }

    /// First index whose timestamp is strictly greater than `time`.
    ///
    /// This is the insertion point that places a new event after every
    /// existing event sharing its timestamp. A generic lower-bound search
    /// would instead land before the run of ties and reorder them.
    #[must_use]
    pub fn upper_bound(&self, time: EventTime) -> usize {
        let mut lo = 0;
        let mut hi = self.events.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.events[mid].timestamp <= time {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Number of events with a timestamp at or before `time`
    #[must_use]
    pub fn count_through(&self, time: EventTime) -> usize {
        self.upper_bound(time)
    }

    /// Number of events in the log
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log holds no events
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event at the given position
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    /// All events in log order
    #[must_use]
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Iterate over events in log order
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
