//! Reducer contract: the pure fold supplied by the caller.

use hindsight_log::Event;

/// Folds events into document state.
///
/// Both methods must be pure, total, and deterministic for every event kind
/// the log may contain: replaying the same events in the same order must
/// always produce equal states, or memoized snapshots would silently
/// diverge from a from-scratch fold.
///
/// `apply` receives the prior state by shared reference and returns a new
/// value. It must not mutate anything reachable from `state`; snapshots
/// handed out by the engine alias previously produced states, and callers
/// rely on them never changing after creation.
pub trait Reducer {
    /// Document state produced by the fold
    type State: Clone;

    /// Build the initial state from the create event
    fn create(&self, event: &Event) -> Self::State;

    /// Fold one mutation event into the prior state
    fn apply(&self, state: &Self::State, event: &Event) -> Self::State;
}
