//! Recursive watch registration over a snapshot of the directory tree.
//!
//! `walkdir` keeps the pending directories on its own heap stack, so depth
//! is not bounded by the call stack. Symlinked directories are not followed.
//! Directories created after the walk are not covered unless the registrar
//! is invoked again for them.

use super::WatchTarget;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDir {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationReport {
    pub watched: Vec<PathBuf>,
    /// Directories whose subtree was skipped because they could not be
    /// watched or listed.
    pub skipped: Vec<SkippedDir>,
}

impl RegistrationReport {
    pub fn is_watched(&self, path: &Path) -> bool {
        self.watched.iter().any(|p| p == path)
    }
}

/// Watch `root` and every subdirectory currently below it.
///
/// Failing to watch `root` is an error. Failures below it are logged,
/// recorded in the report, and the affected subtree is skipped.
pub fn register_tree<T>(target: &mut T, root: &Path) -> Result<RegistrationReport>
where
    T: WatchTarget + ?Sized,
{
    target
        .add_watch(root)
        .with_context(|| format!("cannot watch root directory {}", root.display()))?;

    let mut report = RegistrationReport::default();
    report.watched.push(root.to_path_buf());

    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                warn!(path = %path.display(), error = %e, "cannot list directory; skipping subtree");
                report.skipped.push(SkippedDir {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        match target.add_watch(entry.path()) {
            Ok(()) => {
                debug!(path = %entry.path().display(), "watching");
                report.watched.push(entry.into_path());
            }
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "cannot watch directory; skipping subtree");
                walker.skip_current_dir();
                report.skipped.push(SkippedDir {
                    path: entry.into_path(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        root = %root.display(),
        watched = report.watched.len(),
        skipped = report.skipped.len(),
        "watch registration complete"
    );
    Ok(report)
}
