//! Shared types for eventtail
//!
//! This crate contains the wire shapes exchanged between the event log,
//! the HTTP server, and polling clients.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Event Types
// ============================================================================

/// A single recorded event: one JSON value from one line of the log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(pub Value);

impl Event {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Compact single-line JSON rendering
    pub fn to_compact(&self) -> String {
        self.0.to_string()
    }
}

/// Events read since a client cursor, plus the cursor to use next
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    /// Parsed events in append order
    pub events: Vec<Event>,

    /// Byte length of the log at read time
    pub offset: u64,
}

impl EventBatch {
    pub fn new(events: Vec<Event>, offset: u64) -> Self {
        Self { events, offset }
    }

    /// A batch with no events that leaves the cursor at `offset`
    pub fn empty_at(offset: u64) -> Self {
        Self {
            events: Vec::new(),
            offset,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Liveness report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,

    /// ISO 8601 UTC timestamp with millisecond precision
    pub timestamp: String,
}

impl HealthReport {
    /// Report taken at the current instant
    pub fn now() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Acknowledgement of a clear request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    pub status: String,
}

impl ClearReport {
    pub fn cleared() -> Self {
        Self {
            status: "cleared".to_string(),
        }
    }
}

/// JSON error payload returned for any failed request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
