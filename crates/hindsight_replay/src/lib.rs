//! Hindsight Replay Engine
//!
//! Reconstructs the state of a collaboratively-edited document at any point
//! in its history by folding a reducer over a timestamp-ordered event log.
//! Sparse memoized snapshots bound every query to a short forward replay,
//! and retroactive inserts evict exactly the snapshots they invalidate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod reducer;

mod memo;

pub use engine::{ReplayEngine, MEMO_STRIDE};
pub use reducer::Reducer;
