use std::path::{Path, PathBuf};

use eventtail_log::EventLog;

/// Shared request state: where the log and the viewer live
#[derive(Clone, Debug)]
pub struct AppState {
    log: EventLog,
    viewer_path: PathBuf,
}

impl AppState {
    pub fn new(log: EventLog, viewer_path: impl Into<PathBuf>) -> Self {
        Self {
            log,
            viewer_path: viewer_path.into(),
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn viewer_path(&self) -> &Path {
        &self.viewer_path
    }
}
