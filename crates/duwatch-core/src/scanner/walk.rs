//! Parallel directory walker using `jwalk`.
//!
//! The walker streams entries from a rayon-backed pool. Directories are
//! attached (and watched) as soon as they are seen, so files arriving
//! later in the stream resolve their parent through the path index. jwalk
//! yields parents ahead of their contents; the rare ordering exception on
//! very wide trees is repaired by recreating the missing ancestor chain.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use tracing::debug;

use crate::events::EventSink;
use crate::index::PathIndex;
use crate::model::{DirectoryNode, DiskNode, FileNode};
use crate::scanner::progress::ScanProgress;
use crate::scanner::{register_watch, ScanPolicy, ScanStats};
use crate::watch::WatchRegistry;

/// Cancellation is polled every this many entries.
const CANCEL_CHECK_INTERVAL: u64 = 1_000;

/// Progress updates are sent roughly every this many entries.
const PROGRESS_INTERVAL: u64 = 1_024;

/// Walk the filesystem below `root_path`, populating `root_node`.
///
/// `root_node` must already be created, indexed at `root_path`, and (if
/// possible) watched by the caller; the walk fills in everything beneath
/// it. Every directory visited is indexed and watch-registered; every
/// file is stat'ed and attached. Failed entries are counted and handled
/// per `policy`.
///
/// `progress` is optional and advisory: the initial domain scan reports
/// through it, the bridge's subtree scans pass `None`.
pub fn scan_subtree(
    root_path: &Path,
    root_node: &Arc<DirectoryNode>,
    registry: &WatchRegistry,
    events: &EventSink,
    index: &PathIndex,
    policy: ScanPolicy,
    cancel: &AtomicBool,
    progress: Option<&Sender<ScanProgress>>,
) -> ScanStats {
    let start = Instant::now();
    let mut stats = ScanStats::default();
    let mut entry_counter: u64 = 0;

    let walker = jwalk::WalkDir::new(root_path)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()))
        .process_read_dir(move |_depth, _dir_path, _state, children| {
            // TerminateBranch: the first failed entry ends this
            // directory's listing; everything already yielded stands.
            if policy == ScanPolicy::TerminateBranch {
                if let Some(failed) = children.iter().position(|entry| entry.is_err()) {
                    children.truncate(failed + 1);
                }
            }
        });

    for entry_result in walker {
        entry_counter += 1;
        if entry_counter % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            if let Some(tx) = progress {
                let _ = tx.try_send(ScanProgress::Cancelled);
            }
            stats.duration = start.elapsed();
            stats.cancelled = true;
            return stats;
        }

        let entry = match entry_result {
            Ok(entry) => entry,
            Err(error) => {
                stats.errors += 1;
                let error_path = error
                    .path()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                debug!(path = %error_path, %error, "scan entry failed");
                if let Some(tx) = progress {
                    let _ = tx.try_send(ScanProgress::Error {
                        path: error_path,
                        message: error.to_string(),
                    });
                }
                continue;
            }
        };

        let path = entry.path();
        if path == root_path {
            // The subtree root is the caller's node.
            continue;
        }

        let Some(parent_path) = path.parent() else {
            continue;
        };
        let parent = match index.get(parent_path) {
            Some(DiskNode::Directory(dir)) => dir,
            Some(DiskNode::File(_)) => {
                debug!(path = %path.display(), "parent path resolves to a file; entry dropped");
                stats.errors += 1;
                continue;
            }
            None => match ensure_ancestors(root_path, root_node, parent_path, registry, events, index) {
                Some(dir) => dir,
                None => {
                    stats.errors += 1;
                    continue;
                }
            },
        };

        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            let dir = DirectoryNode::new(&name);
            if parent.add_child(path.clone(), DiskNode::Directory(dir.clone()), events, index) {
                register_watch(registry, &path, &dir);
                stats.dirs += 1;
            }
        } else {
            match std::fs::symlink_metadata(&path) {
                Ok(metadata) => {
                    let size = metadata.len();
                    let file = FileNode::new(&name, size);
                    if parent.add_child(path.clone(), DiskNode::File(file), events, index) {
                        stats.files += 1;
                        stats.total_size += size;
                    }
                }
                Err(error) => {
                    // Typically a file deleted between listing and stat.
                    stats.errors += 1;
                    debug!(path = %path.display(), %error, "stat failed");
                    if let Some(tx) = progress {
                        let _ = tx.try_send(ScanProgress::Error {
                            path: path.to_string_lossy().into_owned(),
                            message: error.to_string(),
                        });
                    }
                }
            }
        }

        if entry_counter % PROGRESS_INTERVAL == 0 {
            if let Some(tx) = progress {
                let _ = tx.try_send(ScanProgress::Update {
                    files_found: stats.files,
                    dirs_found: stats.dirs,
                    total_size: stats.total_size,
                    current_path: path.to_string_lossy().into_owned(),
                });
            }
        }
    }

    stats.duration = start.elapsed();
    stats
}

/// Recreate the ancestor chain for `target` when the parallel walk yields
/// an entry before its parent directory was indexed.
///
/// Each recreated ancestor is attached, indexed, and watch-registered like
/// any scanned directory. Returns the node for `target`.
fn ensure_ancestors(
    root_path: &Path,
    root_node: &Arc<DirectoryNode>,
    target: &Path,
    registry: &WatchRegistry,
    events: &EventSink,
    index: &PathIndex,
) -> Option<Arc<DirectoryNode>> {
    let mut missing = Vec::new();
    let mut current = target.to_path_buf();
    while !index.contains(&current) && current != root_path {
        missing.push(current.clone());
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    let mut parent = match index.get(&current) {
        Some(DiskNode::Directory(dir)) => dir,
        _ => root_node.clone(),
    };

    for ancestor in missing.into_iter().rev() {
        let name = ancestor
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = DirectoryNode::new(&name);
        if parent.add_child(ancestor.clone(), DiskNode::Directory(dir.clone()), events, index) {
            register_watch(registry, &ancestor, &dir);
            parent = dir;
        } else {
            // Lost the race to another walker thread — reuse the node
            // that won.
            match index.get(&ancestor) {
                Some(DiskNode::Directory(existing)) => parent = existing,
                _ => return None,
            }
        }
    }

    Some(parent)
}
