//! Event log processing for eventtail
//!
//! This crate provides best-effort JSON line parsing, offset-based reads
//! of the event log, event filtering, and a polling follower.

mod error;
mod filter;
mod follow;
mod parser;
mod reader;

pub use error::LogError;
pub use filter::EventFilter;
pub use follow::EventFollower;
pub use parser::parse_events;
pub use reader::EventLog;

// Re-export types used in our public API
pub use eventtail_types::{Event, EventBatch};
