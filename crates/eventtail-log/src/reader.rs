use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use eventtail_types::EventBatch;

use crate::error::LogError;
use crate::parser::parse_events;

/// Handle to the append-only event log at a fixed path
///
/// Holds no open file: every operation opens, works, and drops its own
/// handle, so external appends and truncations are always observed.
#[derive(Clone, Debug)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the log file (and parent directories) if it does not exist yet
    pub async fn ensure_exists(&self) -> Result<(), LogError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LogError::io(parent, "create directory", e))?;
            }
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| LogError::io(&self.path, "create", e))?;

        Ok(())
    }

    /// Current size of the log in bytes, 0 when it does not exist
    pub async fn len(&self) -> Result<u64, LogError> {
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(LogError::io(&self.path, "stat", e)),
        }
    }

    /// Read all events appended at or after byte `offset`
    ///
    /// The read is bounded by the size observed when the file is opened;
    /// anything appended later is left for the next call.
    pub async fn read_since(&self, offset: u64) -> Result<EventBatch, LogError> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "event log not created yet");
                return Ok(EventBatch::empty_at(0));
            }
            Err(e) => return Err(LogError::io(&self.path, "open", e)),
        };

        let size = file
            .metadata()
            .await
            .map_err(|e| LogError::io(&self.path, "stat", e))?
            .len();

        // Nothing new since the cursor
        if offset >= size {
            return Ok(EventBatch::empty_at(size));
        }

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| LogError::io(&self.path, "seek", e))?;

        let want = size - offset;
        let mut buf = Vec::with_capacity(usize::try_from(want).unwrap_or(0));
        // take() bounds the read even if the file grows underneath us
        file.take(want)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| LogError::io(&self.path, "read", e))?;

        let events = parse_events(&buf);
        tracing::debug!(
            offset,
            size,
            bytes = buf.len(),
            events = events.len(),
            "read event log"
        );

        Ok(EventBatch::new(events, size))
    }

    /// Truncate the log to zero length, creating it if absent
    pub async fn clear(&self) -> Result<(), LogError> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await
            .map_err(|e| LogError::io(&self.path, "truncate", e))?;

        tracing::info!(path = %self.path.display(), "event log cleared");
        Ok(())
    }
}
