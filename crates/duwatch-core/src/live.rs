//! Entry point — one live watch domain per user-chosen root.
//!
//! `start` validates the root, builds the root node, index, and channels,
//! spawns the background scan and bridge threads, and hands back a
//! [`LiveHandle`]. Consumers read node state through the root, subscribe
//! to the nodes they render, and react to the event stream; `shutdown`
//! (also run on drop) stops both threads and releases the OS watch
//! resource.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use tracing::info;

use crate::error::Error;
use crate::events::{event_channel, NodeEvent, EVENT_CHANNEL_CAPACITY};
use crate::index::PathIndex;
use crate::model::{format_count, format_size, DirectoryNode, DiskNode};
use crate::monitor::Bridge;
use crate::scanner::{
    register_watch, scan_subtree, ScanPolicy, ScanProgress, ScanStats, PROGRESS_CHANNEL_CAPACITY,
};
use crate::watch::WatchRegistry;

/// Deployment-chosen knobs for one watch domain.
#[derive(Clone, Debug)]
pub struct LiveOptions {
    /// Recovery policy for entries that fail to resolve during scans.
    pub scan_policy: ScanPolicy,
    /// Capacity of the domain's node-event buffer.
    pub event_capacity: usize,
}

impl Default for LiveOptions {
    fn default() -> Self {
        Self {
            scan_policy: ScanPolicy::default(),
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// A running watch domain: populated tree, live bridge, event stream.
pub struct LiveHandle {
    root: Arc<DirectoryNode>,
    index: Arc<PathIndex>,
    events_rx: Receiver<NodeEvent>,
    progress_rx: Receiver<ScanProgress>,
    scan_stats: Arc<RwLock<Option<ScanStats>>>,
    cancel: Arc<AtomicBool>,
    registry: Arc<WatchRegistry>,
    scan_thread: Option<JoinHandle<()>>,
    bridge_thread: Option<JoinHandle<()>>,
}

impl LiveHandle {
    /// The domain's root directory node.
    pub fn root(&self) -> &Arc<DirectoryNode> {
        &self.root
    }

    /// The domain's typed change-event stream.
    pub fn events(&self) -> &Receiver<NodeEvent> {
        &self.events_rx
    }

    /// Advisory progress stream for the initial scan.
    pub fn progress(&self) -> &Receiver<ScanProgress> {
        &self.progress_rx
    }

    /// The path → node index for this domain.
    pub fn index(&self) -> &Arc<PathIndex> {
        &self.index
    }

    /// Statistics of the initial scan, available once it has finished
    /// (whether completed or cancelled).
    pub fn scan_stats(&self) -> Option<ScanStats> {
        self.scan_stats.read().clone()
    }

    /// Stop both background threads and release all watch resources.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        // Dropping the watcher disconnects the raw channel, so the bridge
        // exits even if it is mid-wait.
        self.registry.shutdown();
        if let Some(handle) = self.scan_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.bridge_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

/// Start a watch domain over `root_path` with default options.
pub fn start(root_path: impl Into<PathBuf>) -> Result<LiveHandle, Error> {
    start_with(root_path, LiveOptions::default())
}

/// Start a watch domain over `root_path`.
///
/// The root is validated eagerly — an unreadable or non-directory root is
/// a scan-level error. Everything below the root is scanned on a
/// background thread while the bridge thread keeps the tree synchronized
/// with filesystem changes.
pub fn start_with(root_path: impl Into<PathBuf>, options: LiveOptions) -> Result<LiveHandle, Error> {
    let root_path: PathBuf = root_path.into();
    let metadata = std::fs::metadata(&root_path).map_err(|source| Error::RootUnreadable {
        path: root_path.clone(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(Error::NotADirectory { path: root_path });
    }
    let root_path = root_path
        .canonicalize()
        .map_err(|source| Error::RootUnreadable {
            path: root_path.clone(),
            source,
        })?;

    let (events, events_rx) = event_channel(options.event_capacity);
    let (progress_tx, progress_rx) = crossbeam_channel::bounded(PROGRESS_CHANNEL_CAPACITY);
    let (registry, raw_rx) = WatchRegistry::new()?;
    let index = Arc::new(PathIndex::new());
    let cancel = Arc::new(AtomicBool::new(false));
    let scan_stats: Arc<RwLock<Option<ScanStats>>> = Arc::new(RwLock::new(None));

    let root = DirectoryNode::new(&root_display_name(&root_path));
    index.insert(root_path.clone(), DiskNode::Directory(root.clone()));
    register_watch(&registry, &root_path, &root);

    let scan_thread = {
        let root = root.clone();
        let registry = registry.clone();
        let events = events.clone();
        let index = index.clone();
        let cancel = cancel.clone();
        let scan_stats = scan_stats.clone();
        let policy = options.scan_policy;
        thread::Builder::new()
            .name("duwatch-scan".into())
            .spawn(move || {
                info!("starting scan of {}", root_path.display());
                let stats = scan_subtree(
                    &root_path,
                    &root,
                    &registry,
                    &events,
                    &index,
                    policy,
                    &cancel,
                    Some(&progress_tx),
                );
                if stats.cancelled {
                    info!("scan cancelled after {:?}", stats.duration);
                } else {
                    info!(
                        "scan complete: {} files in {} directories, {} ({} errors) in {:?}",
                        format_count(stats.files),
                        format_count(stats.dirs),
                        format_size(stats.total_size),
                        stats.errors,
                        stats.duration
                    );
                    let _ = progress_tx.try_send(ScanProgress::Complete {
                        duration: stats.duration,
                        error_count: stats.errors,
                    });
                }
                *scan_stats.write() = Some(stats);
            })
            .expect("failed to spawn scan thread")
    };

    let bridge = Bridge {
        registry: registry.clone(),
        index: index.clone(),
        events,
        policy: options.scan_policy,
        cancel: cancel.clone(),
    };
    let bridge_thread = thread::Builder::new()
        .name("duwatch-bridge".into())
        .spawn(move || bridge.run(raw_rx))
        .expect("failed to spawn bridge thread");

    Ok(LiveHandle {
        root,
        index,
        events_rx,
        progress_rx,
        scan_stats,
        cancel,
        registry,
        scan_thread: Some(scan_thread),
        bridge_thread: Some(bridge_thread),
    })
}

/// Derive a display name for the domain root.
fn root_display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_is_a_scan_level_error() {
        let result = start("/this/path/does/not/exist/duwatch");
        assert!(matches!(result, Err(Error::RootUnreadable { .. })));
    }

    #[test]
    fn file_root_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let file_path = tmp.path().join("plain.txt");
        std::fs::write(&file_path, b"x").unwrap();

        let result = start(file_path.as_path());
        assert!(matches!(result, Err(Error::NotADirectory { .. })));
    }
}
