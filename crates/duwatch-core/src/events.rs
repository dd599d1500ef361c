//! Typed change events and the bounded channel nodes emit them on.
//!
//! Consumers subscribe to individual nodes and filter the stream by the
//! event's parent. Delivery never blocks the mutating thread: when the
//! buffer is full the newest event is dropped, counted, and logged. The
//! authoritative aggregate state lives in the node model, so a consumer
//! that missed transient events can always reconcile by reading node
//! attributes directly.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::model::{DirectoryNode, DiskNode};

/// Default event-buffer capacity for a watch domain.
///
/// Sized so that a burst of mutations (a large subtree attach fans out one
/// REFRESH per subscribed ancestor) does not immediately hit the overflow
/// path, while still bounding memory when a consumer stalls.
pub const EVENT_CHANNEL_CAPACITY: usize = 10_240;

/// What happened to the parent directory a consumer subscribed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// A child was attached under the parent.
    Add,
    /// A child (for directories: a whole subtree) was detached.
    Remove,
    /// The parent's aggregates changed without a structural change at
    /// this level.
    Refresh,
}

/// A single structural or size change, reported at the directly affected
/// directory.
#[derive(Clone)]
pub struct NodeEvent {
    /// The directory the change happened under.
    pub parent: Arc<DirectoryNode>,
    /// The node that changed. For ancestor REFRESH events this is the
    /// ancestor itself.
    pub child: DiskNode,
    pub kind: EventKind,
}

impl PartialEq for NodeEvent {
    /// Identity equality: two events are equal when they reference the same
    /// nodes, not structurally equal copies.
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && Arc::ptr_eq(&self.parent, &other.parent)
            && self.child.ptr_eq(&other.child)
    }
}

impl fmt::Debug for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeEvent")
            .field("parent", &self.parent.name())
            .field("child", &self.child.name())
            .field("kind", &self.kind)
            .finish()
    }
}

/// Producer side of the event channel, shared by every component that
/// mutates the tree.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<NodeEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSink {
    /// Emit without blocking. A full buffer drops this event; a
    /// disconnected receiver (consumer went away) is not an error.
    pub fn emit(&self, event: NodeEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("dropped event {event:?}: buffer full");
            }
            Err(TrySendError::Disconnected(event)) => {
                debug!("no event consumer for {event:?}");
            }
        }
    }

    /// Number of events dropped so far due to a full buffer.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Create a bounded event channel for one watch domain.
pub fn event_channel(capacity: usize) -> (EventSink, Receiver<NodeEvent>) {
    let (tx, rx) = bounded(capacity);
    (
        EventSink {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DirectoryNode, FileNode};

    #[test]
    fn overflow_drops_newest_and_counts() {
        let (sink, rx) = event_channel(1);
        let dir = DirectoryNode::new("dir");
        let first = FileNode::new("first", 1);
        let second = FileNode::new("second", 2);

        sink.emit(NodeEvent {
            parent: dir.clone(),
            child: DiskNode::File(first.clone()),
            kind: EventKind::Add,
        });
        sink.emit(NodeEvent {
            parent: dir.clone(),
            child: DiskNode::File(second),
            kind: EventKind::Add,
        });

        assert_eq!(sink.dropped(), 1);
        // The buffered event is the oldest one.
        let got = rx.try_recv().unwrap();
        assert!(got.child.ptr_eq(&DiskNode::File(first)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnected_receiver_is_not_counted_as_drop() {
        let (sink, rx) = event_channel(4);
        drop(rx);
        let dir = DirectoryNode::new("dir");
        sink.emit(NodeEvent {
            parent: dir.clone(),
            child: DiskNode::Directory(dir),
            kind: EventKind::Refresh,
        });
        assert_eq!(sink.dropped(), 0);
    }
}
