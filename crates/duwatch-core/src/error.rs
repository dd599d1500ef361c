//! Error types for the engine's public surface.
//!
//! Only domain-level failures are fatal: an unreadable scan root or a
//! watcher that cannot be created at all. Per-entry scan failures,
//! watch-registration failures on individual directories, and notification
//! lookup misses are recovered locally and never reach this enum.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The scan root itself could not be read.
    #[error("root path {path:?} cannot be scanned: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scan root exists but is not a directory.
    #[error("root path {path:?} is not a directory")]
    NotADirectory { path: PathBuf },

    /// The OS notification watcher for the domain could not be created.
    #[error("failed to initialise filesystem watcher: {0}")]
    WatcherInit(#[from] notify::Error),
}
