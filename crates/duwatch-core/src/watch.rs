//! Ownership of the OS notification resource for one watch domain.
//!
//! A domain holds a single `notify` watcher; every directory node carries a
//! [`WatchHandle`] for its own non-recursive registration. Handles are
//! released exactly once, at the moment the node is detached — releasing
//! twice, or after the domain has shut down, is a no-op rather than an
//! error.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{bounded, Receiver, TrySendError};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Capacity of the raw-notification channel between the OS watcher
/// callback and the bridge loop.
///
/// The bridge drains continuously, so this only fills when a notification
/// storm outruns tree mutation. Overflowing drops the newest batch — the
/// tree self-corrects through later notifications and stays internally
/// consistent either way.
pub const NOTIFY_CHANNEL_CAPACITY: usize = 4_096;

/// The domain's watcher, shared by every directory node that registers
/// with it.
pub struct WatchRegistry {
    /// Self back-reference handed to watch handles, so a handle outliving
    /// the registry degrades to a no-op release.
    me: Weak<WatchRegistry>,
    /// `None` once the domain has shut down and the OS resource is gone.
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl WatchRegistry {
    /// Create the watcher and the channel its notifications arrive on.
    pub fn new() -> Result<(Arc<Self>, Receiver<notify::Result<Event>>), notify::Error> {
        let (tx, rx) = bounded(NOTIFY_CHANNEL_CAPACITY);
        let watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match tx.try_send(result) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("dropped raw filesystem notification: buffer full");
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        })?;
        let registry = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            watcher: Mutex::new(Some(watcher)),
        });
        Ok((registry, rx))
    }

    /// Register a non-recursive watch on one directory. Subtree coverage
    /// comes from watching every directory individually.
    pub fn register(&self, path: &Path) -> Result<WatchHandle, notify::Error> {
        let mut guard = self.watcher.lock();
        match guard.as_mut() {
            Some(watcher) => {
                watcher.watch(path, RecursiveMode::NonRecursive)?;
                Ok(WatchHandle {
                    path: path.to_path_buf(),
                    registry: self.me.clone(),
                    released: AtomicBool::new(false),
                })
            }
            None => Err(notify::Error::generic("watch registry already shut down")),
        }
    }

    fn unregister(&self, path: &Path) {
        if let Some(watcher) = self.watcher.lock().as_mut() {
            if let Err(error) = watcher.unwatch(path) {
                // The OS side may already be gone (deleted directory).
                debug!(path = %path.display(), %error, "unwatch failed");
            }
        }
    }

    /// Drop the OS watcher. Idempotent; in-flight notifications are
    /// discarded when the channel disconnects.
    pub fn shutdown(&self) {
        if self.watcher.lock().take().is_some() {
            debug!("watch registry shut down");
        }
    }
}

/// A single directory's registration, owned by its node.
pub struct WatchHandle {
    path: PathBuf,
    registry: Weak<WatchRegistry>,
    released: AtomicBool,
}

impl WatchHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the registration. Returns `true` only for the call that
    /// actually released it.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(&self.path);
        }
        true
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.release();
    }
}
