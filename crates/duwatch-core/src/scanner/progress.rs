//! Scan progress reporting — lightweight messages sent from the scan
//! thread over a crossbeam channel.

use std::time::Duration;

/// Maximum number of progress messages that may queue up in the channel.
///
/// Progress is advisory: messages are sent with `try_send` and silently
/// dropped when no consumer keeps up, so the scan thread never stalls on a
/// reporting channel. The authoritative completion signal is the scan
/// statistics slot on the domain handle.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Progress updates sent from the scan thread.
///
/// The actual tree data is reached through the root node; these messages
/// carry only lightweight counters and status flags.
#[derive(Debug)]
pub enum ScanProgress {
    /// Periodic update with running totals.
    Update {
        files_found: u64,
        dirs_found: u64,
        total_size: u64,
        current_path: String,
    },
    /// A non-fatal error (e.g. permission denied on one entry).
    Error { path: String, message: String },
    /// Scanning completed; the tree is fully populated and watched.
    Complete { duration: Duration, error_count: u64 },
    /// Scan was cancelled before completing.
    Cancelled,
}
