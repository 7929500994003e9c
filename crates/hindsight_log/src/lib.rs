//! Hindsight Event Log
//!
//! Timestamp-ordered mutation events with support for retroactive
//! insertion. Events arriving out of chronological order are placed at
//! their sorted position, after any existing events with the same
//! timestamp.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event;
pub mod log;

pub use event::{Event, EventKind};
pub use log::EventLog;
