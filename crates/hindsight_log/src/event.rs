//! Event records for the mutation log.
//!
//! An event is a timestamped, typed record of a single edit. The `create`
//! kind is distinguished because it establishes the initial document state;
//! every other kind is opaque to the log and interpreted only by the
//! reducer.

use hindsight_core::{EventId, EventTime, HistoryError, HistoryResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event kind - the create event vs an opaque mutation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// The distinguished event establishing the initial document state
    Create,
    /// Any other mutation, tagged with its wire name
    Mutation(String),
}

impl EventKind {
    /// Wire name of the create kind
    pub const CREATE: &'static str = "create";

    /// Whether this is the create kind
    #[must_use]
    pub const fn is_create(&self) -> bool {
        matches!(self, Self::Create)
    }

    /// The wire name of this kind
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => Self::CREATE,
            Self::Mutation(name) => name,
        }
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        if value == Self::CREATE {
            Self::Create
        } else {
            Self::Mutation(value)
        }
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier assigned at ingestion; not part of the wire shape
    #[serde(default)]
    pub id: EventId,
    /// Logical time the edit happened
    pub timestamp: EventTime,
    /// Kind tag, serialized as the wire `type` string
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Opaque payload interpreted only by the reducer
    #[serde(default)]
    pub params: Value,
}

impl Event {
    /// Create a new create event
    #[must_use]
    pub fn create(timestamp: EventTime) -> Self {
        Self {
            id: EventId::new(),
            timestamp,
            kind: EventKind::Create,
            params: Value::Null,
        }
    }

    /// Create a new mutation event of the given kind
    #[must_use]
    pub fn mutation(timestamp: EventTime, kind: &str) -> Self {
        Self {
            id: EventId::new(),
            timestamp,
            kind: EventKind::from(kind),
            params: Value::Null,
        }
    }

    /// Attach a payload
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Whether this is the create event
    #[must_use]
    pub const fn is_create(&self) -> bool {
        self.kind.is_create()
    }

    /// Validate and build an event from a raw JSON record.
    ///
    /// Records missing `timestamp` or `type`, or whose `timestamp` is not a
    /// non-negative integer, are rejected before they can reach the log.
    /// `params` is optional and defaults to null.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error for any malformed record.
    pub fn from_json(value: &Value) -> HistoryResult<Self> {
        let record = value.as_object().ok_or_else(|| HistoryError::MalformedEvent {
            reason: "event must be a JSON object".to_string(),
        })?;

        let kind = record
            .get("type")
            .ok_or_else(|| HistoryError::MissingField {
                field: "type".to_string(),
            })?
            .as_str()
            .ok_or_else(|| HistoryError::MalformedEvent {
                reason: "`type` must be a string".to_string(),
            })?;

        let timestamp = record
            .get("timestamp")
            .ok_or_else(|| HistoryError::MissingField {
                field: "timestamp".to_string(),
            })?
            .as_u64()
            .ok_or_else(|| HistoryError::InvalidTimestamp {
                reason: "timestamp must be a non-negative integer".to_string(),
            })?;

        let params = record.get("params").cloned().unwrap_or(Value::Null);

        Ok(Self {
            id: EventId::new(),
            timestamp: EventTime::from_millis(timestamp),
            kind: EventKind::from(kind),
            params,
        })
    }
}
