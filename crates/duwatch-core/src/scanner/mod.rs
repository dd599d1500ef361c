//! Tree scanner — builds the initial tree with one recursive walk.
//!
//! The walk visits every directory under a root, creating a
//! `DirectoryNode` per directory (each with its own non-recursive watch
//! registration) and a `FileNode` per file, attaching them bottom-up into
//! whatever subtree root the caller provides. Attachment goes through the
//! ordinary `add_child` path, so a consumer that subscribed to the root
//! before scanning observes the incremental build-up, while a
//! pre-subscription scan is silent.
//!
//! The same walk serves two callers: the initial scan of a watch domain,
//! and the watch bridge's subtree scan for a freshly created directory.

pub mod progress;
mod walk;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::model::DirectoryNode;
use crate::watch::WatchRegistry;

pub use progress::{ScanProgress, PROGRESS_CHANNEL_CAPACITY};
pub use walk::scan_subtree;

/// How a walk reacts to a directory entry that fails to resolve
/// (permission error, symlink loop, mid-scan deletion).
///
/// A failed top-level root is never subject to either policy — that is a
/// scan-level error surfaced by the entry point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanPolicy {
    /// Drop the failed subtree and keep scanning its siblings.
    #[default]
    SkipSubtree,
    /// Abort the walk below the failure point; unrelated branches
    /// continue.
    TerminateBranch,
}

/// Counters describing one completed (or cancelled) walk.
#[derive(Clone, Debug, Default)]
pub struct ScanStats {
    pub files: u64,
    pub dirs: u64,
    pub total_size: u64,
    pub errors: u64,
    pub duration: Duration,
    pub cancelled: bool,
}

/// Register a watch for `path` and bind the handle to its node.
///
/// Failure degrades the directory to unwatched — its subtree keeps its
/// scanned state but will not reflect future changes. That is a
/// logged, non-fatal condition.
pub(crate) fn register_watch(registry: &WatchRegistry, path: &Path, node: &Arc<DirectoryNode>) {
    match registry.register(path) {
        Ok(handle) => node.attach_watch(handle),
        Err(error) => warn!(
            path = %path.display(),
            %error,
            "watch registration failed; directory will not track changes"
        ),
    }
}
