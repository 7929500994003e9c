//! Replay engine: ordered ingestion, memoization, snapshot queries.

use crate::memo::MemoStore;
use crate::reducer::Reducer;
use hindsight_core::{EventTime, HistoryError, HistoryResult};
use hindsight_log::{Event, EventLog};

/// Default spacing between memoized snapshots.
///
/// Bounds any query to at most this many reducer applications past the
/// nearest cached snapshot, and memo storage to `len / stride` entries.
pub const MEMO_STRIDE: usize = 10;

/// Engine lifecycle: queries are only answerable once a create event exists.
enum Timeline<S> {
    /// No create event yet. Mutations buffer in sorted order; snapshot
    /// queries fail with [`HistoryError::Uninitialized`].
    Pending { log: EventLog },
    /// Create event known. The memo table is kept fully caught up with the
    /// log after every mutation.
    Ready {
        origin: Event,
        log: EventLog,
        memo: MemoStore<S>,
    },
}

/// Single authority over log ordering, memoization consistency, and
/// snapshot queries.
///
/// Events may arrive in any order, including retroactive inserts whose
/// timestamp predates already-ingested events. Every query answers exactly
/// as if the reducer were folded from the create event through the whole
/// prefix, with the memo table serving purely as a fast-forward cache.
///
/// The engine has no internal locking; callers running it from multiple
/// threads must serialize access around the whole value.
pub struct ReplayEngine<R: Reducer> {
    reducer: R,
    stride: usize,
    timeline: Timeline<R::State>,
}

impl<R: Reducer> ReplayEngine<R> {
    /// Create an engine with no events and the default memo stride.
    #[must_use]
    pub fn new(reducer: R) -> Self {
        Self {
            reducer,
            stride: MEMO_STRIDE,
            timeline: Timeline::Pending {
                log: EventLog::new(),
            },
        }
    }

    /// Override the memo stride. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Build an engine from events in any arrival order.
    ///
    /// Create events are routed to [`Self::set_create_event`], everything
    /// else to [`Self::add_event`]. If no create event is present the
    /// engine stays pending and memoization is deferred until one arrives.
    ///
    /// # Errors
    ///
    /// Returns the first ingestion error encountered.
    pub fn from_events(reducer: R, events: Vec<Event>) -> HistoryResult<Self> {
        let mut engine = Self::new(reducer);
        for event in events {
            if event.is_create() {
                engine.set_create_event(event)?;
            } else {
                engine.add_event(event)?;
            }
        }
        Ok(engine)
    }

    /// Establish (or replace) the create event.
    ///
    /// Any previous memo contents are discarded and the whole log is
    /// re-memoized at the configured stride.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::ExpectedCreate`] if the event is not a
    /// create event.
    pub fn set_create_event(&mut self, event: Event) -> HistoryResult<()> {
        if !event.is_create() {
            return Err(HistoryError::ExpectedCreate {
                found: event.kind.as_str().to_owned(),
            });
        }
        let log = match std::mem::replace(
            &mut self.timeline,
            Timeline::Pending {
                log: EventLog::new(),
            },
        ) {
            Timeline::Pending { log } | Timeline::Ready { log, .. } => log,
        };
        let memo = MemoStore::with_origin(self.reducer.create(&event));
        self.timeline = Timeline::Ready {
            origin: event,
            log,
            memo,
        };
        self.extend_memo()
    }

    /// Insert one mutation event at its sorted position.
    ///
    /// Equal-timestamp events land after all existing ties, so concurrent
    /// arrivals get a single reproducible order. A retroactive insert
    /// evicts every snapshot at or beyond the insertion point; coverage is
    /// then immediately restored through the new end of the log, so query
    /// results never depend on insertion history.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::UnexpectedCreate`] for create events; they
    /// must go through [`Self::set_create_event`].
    pub fn add_event(&mut self, event: Event) -> HistoryResult<()> {
        if event.is_create() {
            return Err(HistoryError::UnexpectedCreate);
        }
        match &mut self.timeline {
            Timeline::Pending { log } => {
                log.insert(event);
                return Ok(());
            }
            Timeline::Ready { log, memo, .. } => {
                let at = log.insert(event);
                let evicted = memo.evict_from(at + 1);
                if evicted > 0 {
                    tracing::debug!(index = at, evicted, "retroactive insert invalidated snapshots");
                }
            }
        }
        self.extend_memo()
    }

    /// State after folding the first `count` events of the log.
    ///
    /// `count = 0` is the origin state produced by the create event alone.
    /// The result is identical to folding the reducer from the create event
    /// through the prefix with no memoization.
    ///
    /// # Errors
    ///
    /// [`HistoryError::Uninitialized`] before a create event exists;
    /// [`HistoryError::OutOfRange`] if `count` exceeds the log length.
    pub fn snapshot_after(&self, count: usize) -> HistoryResult<R::State> {
        let (log, memo) = self.ready()?;
        if count > log.len() {
            return Err(HistoryError::OutOfRange {
                requested: count,
                len: log.len(),
            });
        }
        replay_segment(&self.reducer, log, memo, count)
    }

    /// Current state: the whole known log folded in.
    ///
    /// # Errors
    ///
    /// [`HistoryError::Uninitialized`] before a create event exists.
    pub fn snapshot(&self) -> HistoryResult<R::State> {
        let count = self.ready()?.0.len();
        self.snapshot_after(count)
    }

    /// State as of `time`: all events that happened at or before it.
    ///
    /// `time` need not match any event timestamp. The answer is a pure
    /// function of the current log and `time`, regardless of query order.
    ///
    /// # Errors
    ///
    /// [`HistoryError::Uninitialized`] before a create event exists.
    pub fn snapshot_at(&self, time: EventTime) -> HistoryResult<R::State> {
        let count = self.ready()?.0.count_through(time);
        self.snapshot_after(count)
    }

    /// Number of mutation events ingested so far.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.timeline {
            Timeline::Pending { log } | Timeline::Ready { log, .. } => log.len(),
        }
    }

    /// Whether no mutation events have been ingested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The create event, once set.
    #[must_use]
    pub fn create_event(&self) -> Option<&Event> {
        match &self.timeline {
            Timeline::Ready { origin, .. } => Some(origin),
            Timeline::Pending { .. } => None,
        }
    }

    /// Configured memo stride.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    fn ready(&self) -> HistoryResult<(&EventLog, &MemoStore<R::State>)> {
        match &self.timeline {
            Timeline::Ready { log, memo, .. } => Ok((log, memo)),
            Timeline::Pending { .. } => Err(HistoryError::Uninitialized),
        }
    }

    /// Restore memo coverage through the end of the log.
    ///
    /// One snapshot per multiple-of-stride log index, each produced by
    /// replaying forward from the previous survivor, strictly in
    /// increasing order.
    fn extend_memo(&mut self) -> HistoryResult<()> {
        let stride = self.stride;
        let Timeline::Ready { log, memo, .. } = &mut self.timeline else {
            return Ok(());
        };
        let len = log.len();
        let mut index = 0;
        while index < len {
            let applied = index + 1;
            if applied > memo.last_applied() {
                let state = replay_segment(&self.reducer, log, memo, applied)?;
                memo.push(applied, state)?;
                tracing::trace!(applied, "memoized snapshot");
            }
            index += stride;
        }
        Ok(())
    }

    #[cfg(test)]
    fn memo_positions(&self) -> Vec<usize> {
        match &self.timeline {
            Timeline::Ready { memo, .. } => memo.positions(),
            Timeline::Pending { .. } => Vec::new(),
        }
    }
}

/// Fold from the nearest cached snapshot forward to `applied` events.
fn replay_segment<R: Reducer>(
    reducer: &R,
    log: &EventLog,
    memo: &MemoStore<R::State>,
    applied: usize,
) -> HistoryResult<R::State> {
    let (start, nearest) = memo.nearest_at_or_before(applied);
    let mut state = nearest.clone();
    for index in start..applied {
        let event = log.get(index).ok_or(HistoryError::OutOfRange {
            requested: applied,
            len: log.len(),
        })?;
        state = reducer.apply(&state, event);
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    /// State is the list of event tags in fold order; makes ordering
    /// assertions exact.
    struct TraceReducer;

    impl Reducer for TraceReducer {
        type State = Vec<String>;

        fn create(&self, _event: &Event) -> Self::State {
            Vec::new()
        }

        fn apply(&self, state: &Self::State, event: &Event) -> Self::State {
            let mut next = state.clone();
            next.push(
                event.params["tag"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
            );
            next
        }
    }

    /// Crossword-style grid: create sizes it, `fill` writes one cell.
    struct GridReducer;

    type Grid = Vec<Vec<Option<char>>>;

    impl Reducer for GridReducer {
        type State = Grid;

        fn create(&self, event: &Event) -> Self::State {
            let rows = event.params["rows"].as_u64().unwrap() as usize;
            let cols = event.params["cols"].as_u64().unwrap() as usize;
            vec![vec![None; cols]; rows]
        }

        fn apply(&self, state: &Self::State, event: &Event) -> Self::State {
            let mut next = state.clone();
            if event.kind.as_str() == "fill" {
                let r = event.params["cell"]["r"].as_u64().unwrap() as usize;
                let c = event.params["cell"]["c"].as_u64().unwrap() as usize;
                next[r][c] = event.params["value"].as_str().unwrap().chars().next();
            }
            next
        }
    }

    fn edit(time: u64, tag: &str) -> Event {
        Event::mutation(EventTime::from_millis(time), "edit").with_params(json!({"tag": tag}))
    }

    fn fill(time: u64, r: usize, c: usize, value: &str) -> Event {
        Event::mutation(EventTime::from_millis(time), "fill")
            .with_params(json!({"cell": {"r": r, "c": c}, "value": value}))
    }

    fn grid_create() -> Event {
        Event::create(EventTime::zero()).with_params(json!({"rows": 3, "cols": 3}))
    }

    fn trace_engine() -> ReplayEngine<TraceReducer> {
        let mut engine = ReplayEngine::new(TraceReducer);
        engine
            .set_create_event(Event::create(EventTime::zero()))
            .unwrap();
        engine
    }

    #[test]
    fn test_query_before_create_fails() {
        let mut engine = ReplayEngine::new(TraceReducer);
        engine.add_event(edit(5, "a")).unwrap();

        assert_eq!(engine.snapshot(), Err(HistoryError::Uninitialized));
        assert_eq!(engine.snapshot_after(0), Err(HistoryError::Uninitialized));
        assert_eq!(
            engine.snapshot_at(EventTime::from_millis(99)),
            Err(HistoryError::Uninitialized)
        );
    }

    #[test]
    fn test_origin_snapshot() {
        let engine = trace_engine();
        assert_eq!(engine.snapshot_after(0).unwrap(), Vec::<String>::new());
        assert_eq!(engine.snapshot().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_snapshot_prefixes() {
        let mut engine = trace_engine();
        engine.add_event(edit(10, "e0")).unwrap();
        engine.add_event(edit(30, "e1")).unwrap();

        assert_eq!(engine.snapshot_after(1).unwrap(), vec!["e0"]);
        assert_eq!(engine.snapshot_after(2).unwrap(), vec!["e0", "e1"]);
        assert_eq!(engine.snapshot().unwrap(), vec!["e0", "e1"]);
    }

    #[test]
    fn test_retroactive_insert_reorders_fold() {
        let mut engine = trace_engine();
        engine.add_event(edit(10, "e0")).unwrap();
        engine.add_event(edit(30, "e1")).unwrap();
        engine.add_event(edit(20, "e2")).unwrap();

        assert_eq!(engine.snapshot().unwrap(), vec!["e0", "e2", "e1"]);
        assert_eq!(engine.snapshot_after(2).unwrap(), vec!["e0", "e2"]);
    }

    #[test]
    fn test_tie_break_is_arrival_order() {
        let mut first = trace_engine();
        first.add_event(edit(7, "a")).unwrap();
        first.add_event(edit(7, "b")).unwrap();
        assert_eq!(first.snapshot().unwrap(), vec!["a", "b"]);

        let mut second = trace_engine();
        second.add_event(edit(7, "b")).unwrap();
        second.add_event(edit(7, "a")).unwrap();
        assert_eq!(second.snapshot().unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_snapshot_at_timestamp() {
        let mut engine = trace_engine();
        engine.add_event(edit(10, "e0")).unwrap();
        engine.add_event(edit(30, "e1")).unwrap();

        assert_eq!(
            engine.snapshot_at(EventTime::from_millis(5)).unwrap(),
            Vec::<String>::new()
        );
        assert_eq!(
            engine.snapshot_at(EventTime::from_millis(10)).unwrap(),
            vec!["e0"]
        );
        assert_eq!(
            engine.snapshot_at(EventTime::from_millis(29)).unwrap(),
            vec!["e0"]
        );
        assert_eq!(
            engine.snapshot_at(EventTime::from_millis(30)).unwrap(),
            vec!["e0", "e1"]
        );
        assert_eq!(
            engine.snapshot_at(EventTime::from_millis(1000)).unwrap(),
            vec!["e0", "e1"]
        );
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let mut engine = trace_engine();
        engine.add_event(edit(10, "e0")).unwrap();
        assert_eq!(engine.snapshot().unwrap(), engine.snapshot().unwrap());
    }

    #[test]
    fn test_snapshot_out_of_range() {
        let mut engine = trace_engine();
        engine.add_event(edit(10, "e0")).unwrap();
        assert_eq!(
            engine.snapshot_after(2),
            Err(HistoryError::OutOfRange {
                requested: 2,
                len: 1
            })
        );
    }

    #[test]
    fn test_create_routed_to_add_event_rejected() {
        let mut engine = trace_engine();
        let err = engine
            .add_event(Event::create(EventTime::zero()))
            .unwrap_err();
        assert_eq!(err, HistoryError::UnexpectedCreate);
    }

    #[test]
    fn test_mutation_routed_to_set_create_rejected() {
        let mut engine = ReplayEngine::new(TraceReducer);
        let err = engine.set_create_event(edit(1, "a")).unwrap_err();
        assert_eq!(
            err,
            HistoryError::ExpectedCreate {
                found: "edit".to_string()
            }
        );
    }

    #[test]
    fn test_pending_events_replay_once_created() {
        let mut engine = ReplayEngine::new(TraceReducer);
        engine.add_event(edit(30, "late")).unwrap();
        engine.add_event(edit(10, "early")).unwrap();
        assert_eq!(engine.len(), 2);
        assert!(engine.create_event().is_none());

        engine
            .set_create_event(Event::create(EventTime::zero()))
            .unwrap();
        assert_eq!(engine.snapshot().unwrap(), vec!["early", "late"]);
    }

    #[test]
    fn test_replacing_create_rebuilds() {
        let mut engine = trace_engine();
        engine.add_event(edit(10, "e0")).unwrap();

        engine
            .set_create_event(Event::create(EventTime::from_millis(1)))
            .unwrap();
        assert_eq!(
            engine.create_event().unwrap().timestamp,
            EventTime::from_millis(1)
        );
        assert_eq!(engine.snapshot().unwrap(), vec!["e0"]);
    }

    #[test]
    fn test_from_events_unordered_with_create() {
        let events = vec![
            edit(30, "e1"),
            Event::create(EventTime::zero()),
            edit(10, "e0"),
        ];
        let engine = ReplayEngine::from_events(TraceReducer, events).unwrap();
        assert_eq!(engine.snapshot().unwrap(), vec!["e0", "e1"]);
    }

    #[test]
    fn test_from_events_without_create_stays_pending() {
        let engine = ReplayEngine::from_events(TraceReducer, vec![edit(1, "a")]).unwrap();
        assert_eq!(engine.snapshot(), Err(HistoryError::Uninitialized));
    }

    fn expected_positions(len: usize, stride: usize) -> Vec<usize> {
        std::iter::once(0)
            .chain((0..len).step_by(stride).map(|index| index + 1))
            .collect()
    }

    #[test]
    fn test_memo_coverage_after_appends() {
        let mut engine = trace_engine();
        for i in 0..25 {
            engine.add_event(edit(i, "x")).unwrap();
        }
        assert_eq!(engine.memo_positions(), expected_positions(25, MEMO_STRIDE));
        assert_eq!(engine.memo_positions(), vec![0, 1, 11, 21]);
    }

    #[test]
    fn test_memo_coverage_after_retroactive_insert() {
        let mut engine = trace_engine();
        for i in 0..25 {
            engine.add_event(edit(10 + i, "x")).unwrap();
        }
        // lands at index 0, evicting everything but the origin
        engine.add_event(edit(1, "front")).unwrap();
        assert_eq!(engine.memo_positions(), expected_positions(26, MEMO_STRIDE));
        assert_eq!(engine.snapshot().unwrap()[0], "front");
    }

    #[test]
    fn test_grid_scenario() {
        let mut engine = ReplayEngine::new(GridReducer);
        engine.set_create_event(grid_create()).unwrap();

        engine.add_event(fill(5, 0, 0, "A")).unwrap();
        let after_a = engine.snapshot_after(1).unwrap();
        assert_eq!(after_a[0][0], Some('A'));
        assert_eq!(after_a[0][1], None);

        // retroactive fill before the first event
        engine.add_event(fill(1, 0, 1, "B")).unwrap();

        let after_b_only = engine.snapshot_after(1).unwrap();
        assert_eq!(after_b_only[0][0], None);
        assert_eq!(after_b_only[0][1], Some('B'));

        let after_both = engine.snapshot_after(2).unwrap();
        assert_eq!(after_both[0][0], Some('A'));
        assert_eq!(after_both[0][1], Some('B'));
    }

    #[test]
    fn test_stride_one_memoizes_everything() {
        let mut engine = ReplayEngine::new(TraceReducer).with_stride(1);
        engine
            .set_create_event(Event::create(EventTime::zero()))
            .unwrap();
        for i in 0..5 {
            engine.add_event(edit(i, "x")).unwrap();
        }
        assert_eq!(engine.memo_positions(), vec![0, 1, 2, 3, 4, 5]);
    }

    // Replay through the memo must match a memo-free fold after any
    // arrival order, at every prefix, and at every timestamp.
    proptest! {
        #[test]
        fn prop_replay_equivalence(
            times in proptest::collection::vec(0u64..25, 0..40),
            stride in 1usize..8,
        ) {
            let mut engine = ReplayEngine::new(TraceReducer).with_stride(stride);
            engine.set_create_event(Event::create(EventTime::zero())).unwrap();

            // model: sorted (time, tag) pairs with upper-bound insertion
            let mut model: Vec<(u64, String)> = Vec::new();
            for (arrival, time) in times.iter().enumerate() {
                let tag = format!("e{arrival}");
                engine.add_event(edit(*time, &tag)).unwrap();

                let at = model.iter().take_while(|(t, _)| t <= time).count();
                model.insert(at, (*time, tag));

                let expected: Vec<String> =
                    model.iter().map(|(_, tag)| tag.clone()).collect();
                prop_assert_eq!(engine.snapshot().unwrap(), expected);

                let len = model.len();
                prop_assert_eq!(
                    engine.memo_positions(),
                    expected_positions(len, stride)
                );
            }

            for count in 0..=model.len() {
                let expected: Vec<String> =
                    model[..count].iter().map(|(_, tag)| tag.clone()).collect();
                prop_assert_eq!(engine.snapshot_after(count).unwrap(), expected);
            }

            for time in 0..26u64 {
                let expected: Vec<String> = model
                    .iter()
                    .filter(|(t, _)| *t <= time)
                    .map(|(_, tag)| tag.clone())
                    .collect();
                prop_assert_eq!(
                    engine.snapshot_at(EventTime::from_millis(time)).unwrap(),
                    expected
                );
            }
        }
    }
}
