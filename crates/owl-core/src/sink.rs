//! Append-only file sinks shared by the alert log and the buffered event log.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Failure to append to one of the durable logs. Never fatal to the event loop.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("cannot open {} for append: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("write to {} failed: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Opens `path` for append, creating the file but never its parent directory.
pub(crate) fn open_for_append(path: &Path) -> Result<File, SinkError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })
}

pub(crate) fn write_failed(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::Write {
        path: path.to_path_buf(),
        source,
    }
}
