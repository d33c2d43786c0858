//! Watch registration and the raw notification source.
//!
//! The event loop only sees the two traits below; the `notify` backend lives
//! in [`source`] and tests drive the loop with scripted sources instead.

pub mod registrar;
pub mod source;

pub use registrar::{register_tree, RegistrationReport, SkippedDir};
pub use source::{translate, NotifySource};

use owl_core::RawEvent;
use std::path::Path;

/// Something that can subscribe to mutation events for a single directory.
pub trait WatchTarget {
    /// Watch `dir` itself, non-recursively, for create, delete, modify and move.
    fn add_watch(&mut self, dir: &Path) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("notification backend error: {0}")]
    Backend(#[from] notify::Error),
    #[error("notification channel disconnected")]
    Disconnected,
}

/// Blocking stream of raw change records.
pub trait NotificationSource: WatchTarget {
    /// Blocks until the next batch of records arrives. `Ok(None)` means the
    /// source has ended cleanly; an error is fatal to the event loop.
    fn next_batch(&mut self) -> Result<Option<Vec<RawEvent>>, SourceError>;
}
