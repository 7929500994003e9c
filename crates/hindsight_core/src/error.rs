//! Shared error types for hindsight.

/// Shared result type
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors surfaced by the event log and the replay engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// Snapshot query before any create event was set
    #[error("log is uninitialized: no create event has been set")]
    Uninitialized,

    /// Attempt to memoize a position at or before the last memoized one.
    /// Indicates a bug in insertion/eviction bookkeeping; query results can
    /// no longer be trusted once this surfaces.
    #[error("memoization out of order: attempted {attempted} after {last_applied}")]
    MemoOrderViolation {
        /// Position of the last snapshot already in the store
        last_applied: usize,
        /// Position the caller attempted to memoize
        attempted: usize,
    },

    /// Ingested event is not a JSON object
    #[error("malformed event: {reason}")]
    MalformedEvent {
        /// What was wrong with the record
        reason: String,
    },

    /// Ingested event is missing a required field
    #[error("event is missing required field `{field}`")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// Ingested event carries an unusable timestamp
    #[error("invalid timestamp: {reason}")]
    InvalidTimestamp {
        /// Why the timestamp was rejected
        reason: String,
    },

    /// A non-create event was routed to `set_create_event`
    #[error("expected a create event, found `{found}`")]
    ExpectedCreate {
        /// Kind of the event that was supplied
        found: String,
    },

    /// A create event was routed to `add_event`
    #[error("create events must go through set_create_event")]
    UnexpectedCreate,

    /// Snapshot query beyond the end of the log
    #[error("position {requested} is out of range for a log of {len} events")]
    OutOfRange {
        /// Requested position
        requested: usize,
        /// Number of events in the log
        len: usize,
    },
}
