//! Watch bridge — translates raw filesystem notifications into tree
//! mutations.
//!
//! One long-running loop per watch domain. Each notification resolves its
//! absolute path against the path index and dispatches: creates attach a
//! freshly scanned subtree or a stat'ed file, deletes detach whole
//! subtrees (recursively releasing their watches), modifies re-stat file
//! sizes. Paths the index cannot resolve are dropped — the authoritative
//! state lives in the tree and stays self-consistent regardless of missed
//! transient events.
//!
//! The loop blocks for at most [`BATCH_WAIT`] per receive so cancellation
//! is observed at batch boundaries; in-flight notifications at shutdown
//! are discarded.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::event::{ModifyKind, RenameMode};
use notify::Event;
use tracing::{debug, info, warn};

use crate::events::EventSink;
use crate::index::PathIndex;
use crate::model::{DirectoryNode, DiskNode, FileNode};
use crate::scanner::{register_watch, scan_subtree, ScanPolicy};
use crate::watch::WatchRegistry;

/// How long one receive blocks before the cancellation flag is re-checked.
const BATCH_WAIT: Duration = Duration::from_millis(200);

/// Everything the bridge needs to turn a notification into a mutation.
pub(crate) struct Bridge {
    pub registry: Arc<WatchRegistry>,
    pub index: Arc<PathIndex>,
    pub events: EventSink,
    pub policy: ScanPolicy,
    pub cancel: Arc<AtomicBool>,
}

impl Bridge {
    /// Run until cancellation or until the watcher shuts down and the raw
    /// channel disconnects.
    pub fn run(&self, raw_rx: Receiver<notify::Result<Event>>) {
        info!("watch bridge started");
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                break;
            }
            match raw_rx.recv_timeout(BATCH_WAIT) {
                Ok(Ok(event)) => self.dispatch(&event),
                Ok(Err(error)) => warn!(%error, "watcher reported an error"),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("watch bridge stopped");
    }

    /// Map a notify event onto create/remove/modify mutations.
    ///
    /// Renames decompose into remove + create, the same shape the OS
    /// reports a move as when only one side is inside the watch domain.
    fn dispatch(&self, event: &Event) {
        use notify::EventKind::*;
        match &event.kind {
            Create(_) => {
                for path in &event.paths {
                    self.apply_create(path);
                }
            }
            Remove(_) => {
                for path in &event.paths {
                    self.apply_remove(path);
                }
            }
            Modify(ModifyKind::Name(RenameMode::From)) => {
                if let Some(path) = event.paths.first() {
                    self.apply_remove(path);
                }
            }
            Modify(ModifyKind::Name(RenameMode::To)) => {
                if let Some(path) = event.paths.first() {
                    self.apply_create(path);
                }
            }
            Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let [from, to] = event.paths.as_slice() {
                    self.apply_remove(from);
                    self.apply_create(to);
                }
            }
            Modify(ModifyKind::Name(_)) => {
                // Direction unknown — probe the filesystem for each side.
                for path in &event.paths {
                    if path.exists() {
                        self.apply_create(path);
                    } else {
                        self.apply_remove(path);
                    }
                }
            }
            Modify(_) => {
                for path in &event.paths {
                    self.apply_modify(path);
                }
            }
            _ => {}
        }
    }

    pub(crate) fn apply_create(&self, path: &Path) {
        if self.index.contains(path) {
            // An overlapping subtree scan already attached this path.
            debug!(path = %path.display(), "create for already-known path dropped");
            return;
        }
        let Some(parent_path) = path.parent() else {
            return;
        };
        let parent = match self.index.get(parent_path) {
            Some(DiskNode::Directory(dir)) => dir,
            _ => {
                debug!(path = %path.display(), "create without a known parent dropped");
                return;
            }
        };
        let Some(name) = path.file_name() else {
            return;
        };
        let name = name.to_string_lossy();

        let metadata = match std::fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(error) => {
                // Created and deleted before we got here.
                debug!(path = %path.display(), %error, "created path vanished");
                return;
            }
        };

        let attached = if metadata.is_dir() {
            // Build the subtree detached but fully watched and indexed,
            // then attach it with a single ADD at the live parent.
            let dir = DirectoryNode::new(&name);
            self.index
                .insert(path.to_path_buf(), DiskNode::Directory(dir.clone()));
            register_watch(&self.registry, path, &dir);
            let stats = scan_subtree(
                path,
                &dir,
                &self.registry,
                &self.events,
                &self.index,
                self.policy,
                &self.cancel,
                None,
            );
            debug!(
                path = %path.display(),
                files = stats.files,
                dirs = stats.dirs,
                "created directory scanned"
            );
            parent.add_child(
                path.to_path_buf(),
                DiskNode::Directory(dir),
                &self.events,
                &self.index,
            )
        } else {
            let file = FileNode::new(&name, metadata.len());
            parent.add_child(
                path.to_path_buf(),
                DiskNode::File(file),
                &self.events,
                &self.index,
            )
        };
        if !attached {
            warn!(path = %path.display(), "created node could not be attached");
        }
    }

    pub(crate) fn apply_remove(&self, path: &Path) {
        let Some(node) = self.index.get(path) else {
            debug!(path = %path.display(), "remove for unknown path dropped");
            return;
        };
        let Some(parent) = node.parent() else {
            warn!(path = %path.display(), "remove notification for a domain root ignored");
            return;
        };
        parent.remove_child(path, &node, &self.events, &self.index);
    }

    pub(crate) fn apply_modify(&self, path: &Path) {
        // Modifies on directories and unresolved paths carry no size
        // information for the tree.
        let Some(DiskNode::File(file)) = self.index.get(path) else {
            return;
        };
        let Some(parent) = file.parent() else {
            return;
        };
        match std::fs::symlink_metadata(path) {
            Ok(metadata) => parent.modify_child(&file, metadata.len(), &self.events),
            Err(error) => {
                debug!(path = %path.display(), %error, "modified path vanished");
            }
        }
    }
}
