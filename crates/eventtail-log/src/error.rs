use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while touching the event log file
#[derive(Debug, Error)]
pub enum LogError {
    /// I/O failure other than the file being absent
    #[error("failed to {operation} {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, operation: &'static str, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation,
            source,
        }
    }
}
