//! Timestamped, process-attributed milestone records shared across children
//!
//! The file is truncated once when the log is created. Every record is then
//! appended through an `O_APPEND` descriptor with a single `write`, so
//! children that inherit the handle across a fork never interleave inside a
//! line.

use super::timestamp::now_log_timestamp;
use eyre::WrapErr;
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::warn;

/// Handle to the milestone log. Cheap to clone; pass it to each child entry.
#[derive(Debug, Clone)]
pub struct MilestoneLog {
    sink: Option<Arc<Sink>>,
}

#[derive(Debug)]
struct Sink {
    path: PathBuf,
    file: File,
}

impl MilestoneLog {
    /// Create (or truncate) the log file at `path` and open it for appending.
    pub fn create(path: &Path) -> eyre::Result<Self> {
        File::create(path)
            .wrap_err_with(|| format!("unable to create log file {}", path.display()))?;
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .wrap_err_with(|| format!("unable to open log file {}", path.display()))?;
        Ok(Self {
            sink: Some(Arc::new(Sink {
                path: path.to_path_buf(),
                file,
            })),
        })
    }

    /// A log that discards every record
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.sink.as_deref().map(|sink| sink.path.as_path())
    }

    /// Append one record attributed to `process`.
    ///
    /// Write failures are reported but never interrupt the caller.
    pub fn record(&self, process: &str, message: impl AsRef<str>) {
        let Some(sink) = self.sink.as_deref() else {
            return;
        };
        let line = format_record(&now_log_timestamp(), process, message.as_ref());
        // One write per record keeps O_APPEND lines whole
        if let Err(e) = (&sink.file).write_all(line.as_bytes()) {
            warn!("Failed to write to {}: {}", sink.path.display(), e);
        }
    }
}

fn format_record(timestamp: &str, process: &str, message: &str) -> String {
    format!("{} - {} - {}\n", timestamp, process, message)
}
