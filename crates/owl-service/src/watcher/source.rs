//! `notify`-backed notification source.
//!
//! Every directory is watched non-recursively; the registrar decides which
//! directories are covered. The watcher callback forwards results over a
//! std channel and the event loop thread blocks on the receiving end.

use super::{NotificationSource, SourceError, WatchTarget};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use owl_core::{ChangeMask, RawEvent};
use std::path::Path;
use std::sync::mpsc;
use tracing::trace;

pub struct NotifySource {
    watcher: RecommendedWatcher,
    rx: mpsc::Receiver<notify::Result<Event>>,
}

impl NotifySource {
    pub fn new() -> Result<Self, SourceError> {
        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        Ok(Self { watcher, rx })
    }
}

impl WatchTarget for NotifySource {
    fn add_watch(&mut self, dir: &Path) -> anyhow::Result<()> {
        self.watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(())
    }
}

impl NotificationSource for NotifySource {
    fn next_batch(&mut self) -> Result<Option<Vec<RawEvent>>, SourceError> {
        match self.rx.recv() {
            Ok(Ok(event)) => {
                trace!(kind = ?event.kind, paths = ?event.paths, "raw notification");
                Ok(Some(translate(&event)))
            }
            Ok(Err(e)) => Err(SourceError::Backend(e)),
            Err(_) => Err(SourceError::Disconnected),
        }
    }
}

/// One raw record per affected path; a path-less event yields one nameless
/// record. Unsubscribed classes (access, metadata) yield nothing.
pub fn translate(event: &Event) -> Vec<RawEvent> {
    let Some(mask) = change_mask(&event.kind) else {
        return Vec::new();
    };
    if event.paths.is_empty() {
        return vec![RawEvent::nameless(mask)];
    }
    event
        .paths
        .iter()
        .map(|path| RawEvent::new(mask, path.to_string_lossy()))
        .collect()
}

fn change_mask(kind: &EventKind) -> Option<ChangeMask> {
    match kind {
        EventKind::Create(CreateKind::Folder) => Some(ChangeMask::CREATE | ChangeMask::IS_DIR),
        EventKind::Create(_) => Some(ChangeMask::CREATE),
        EventKind::Remove(RemoveKind::Folder) => Some(ChangeMask::DELETE | ChangeMask::IS_DIR),
        EventKind::Remove(_) => Some(ChangeMask::DELETE),
        // Both halves of the rename were already reported separately.
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => None,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(ChangeMask::MOVED_FROM),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(ChangeMask::MOVED_TO),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeMask::MOVE),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeMask::MODIFY),
        EventKind::Access(_) => None,
        EventKind::Any | EventKind::Other => Some(ChangeMask::empty()),
    }
}
