//! HTTP surface for eventtail
//!
//! This crate exposes the event log over HTTP: incremental reads by byte
//! offset, clearing, a health check, and the bundled HTML viewer.

mod error;
mod router;
mod state;

pub use error::ApiError;
pub use router::{router, serve};
pub use state::AppState;
