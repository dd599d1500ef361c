//! Tree nodes and their aggregation/mutation primitives.
//!
//! Nodes are shared handles (`Arc`) because the tree is mutated by a
//! background bridge thread while consumers read it. Parent links are
//! `Weak` back-references used only for upward propagation and root
//! lookup; ownership flows strictly downward through the children maps.
//!
//! Aggregate updates always propagate to the root. Event emission is gated
//! per node by that node's own subscriber set, so structural correctness
//! never depends on who is watching.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use compact_str::CompactString;
use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::events::{EventKind, EventSink, NodeEvent};
use crate::index::PathIndex;
use crate::watch::WatchHandle;

/// Opaque consumer identity registered against a node.
///
/// The contract is identity equality and idempotent add/remove; tokens are
/// minted from a process-wide counter so two tokens are never equal unless
/// they are the same token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberToken(u64);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

impl SubscriberToken {
    pub fn new() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability shared by both node variants: name, parent back-reference,
/// subscriber set.
struct NodeCore {
    name: CompactString,
    parent: RwLock<Weak<DirectoryNode>>,
    subscribers: RwLock<HashSet<SubscriberToken>>,
}

impl NodeCore {
    fn new(name: &str) -> Self {
        Self {
            name: CompactString::new(name),
            parent: RwLock::new(Weak::new()),
            subscribers: RwLock::new(HashSet::new()),
        }
    }

    fn parent(&self) -> Option<Arc<DirectoryNode>> {
        self.parent.read().upgrade()
    }

    fn set_parent(&self, parent: &Arc<DirectoryNode>) {
        *self.parent.write() = Arc::downgrade(parent);
    }

    fn clear_parent(&self) {
        *self.parent.write() = Weak::new();
    }

    fn subscribe(&self, token: SubscriberToken) -> bool {
        self.subscribers.write().insert(token)
    }

    fn unsubscribe(&self, token: SubscriberToken) -> bool {
        self.subscribers.write().remove(&token)
    }

    fn has_subscribers(&self) -> bool {
        !self.subscribers.read().is_empty()
    }
}

/// A plain file. `size` is a stored scalar, changed only by modify events.
pub struct FileNode {
    core: NodeCore,
    size_bytes: AtomicU64,
}

impl FileNode {
    pub fn new(name: &str, size: u64) -> Arc<Self> {
        Arc::new(Self {
            core: NodeCore::new(name),
            size_bytes: AtomicU64::new(size),
        })
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn size(&self) -> u64 {
        self.size_bytes.load(Ordering::Relaxed)
    }

    pub fn parent(&self) -> Option<Arc<DirectoryNode>> {
        self.core.parent()
    }

    pub fn subscribe(&self, token: SubscriberToken) -> bool {
        self.core.subscribe(token)
    }

    pub fn unsubscribe(&self, token: SubscriberToken) -> bool {
        self.core.unsubscribe(token)
    }
}

impl fmt::Debug for FileNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileNode")
            .field("name", &self.name())
            .field("size", &self.size())
            .finish()
    }
}

/// A directory. `size` and `count` are accumulators derived from the
/// descendants, maintained incrementally by commutative atomic adds —
/// never by full recomputation.
pub struct DirectoryNode {
    /// Self back-reference so `&self` methods can hand out owning handles
    /// (event payloads, child parent links).
    me: Weak<DirectoryNode>,
    core: NodeCore,
    size_bytes: AtomicI64,
    file_count: AtomicI64,
    child_nodes: RwLock<HashMap<CompactString, DiskNode>>,
    watch: Mutex<Option<WatchHandle>>,
}

impl DirectoryNode {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            core: NodeCore::new(name),
            size_bytes: AtomicI64::new(0),
            file_count: AtomicI64::new(0),
            child_nodes: RwLock::new(HashMap::new()),
            watch: Mutex::new(None),
        })
    }

    fn arc(&self) -> Arc<DirectoryNode> {
        self.me.upgrade().expect("node is alive while borrowed")
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Sum of all descendant file sizes, in bytes.
    pub fn size(&self) -> u64 {
        self.size_bytes.load(Ordering::Relaxed).max(0) as u64
    }

    /// Number of descendant files (not directories).
    pub fn count(&self) -> u64 {
        self.file_count.load(Ordering::Relaxed).max(0) as u64
    }

    pub fn parent(&self) -> Option<Arc<DirectoryNode>> {
        self.core.parent()
    }

    /// Snapshot of the direct children, unordered. Callers sort.
    pub fn children(&self) -> Vec<DiskNode> {
        self.child_nodes.read().values().cloned().collect()
    }

    /// Direct child by name.
    pub fn child(&self, name: &str) -> Option<DiskNode> {
        self.child_nodes.read().get(name).cloned()
    }

    /// Snapshot of the direct children, largest first.
    pub fn children_sorted_by_size(&self) -> Vec<DiskNode> {
        let mut children = self.children();
        children.sort_unstable_by(|a, b| b.size().cmp(&a.size()));
        children
    }

    pub fn subscribe(&self, token: SubscriberToken) -> bool {
        self.core.subscribe(token)
    }

    pub fn unsubscribe(&self, token: SubscriberToken) -> bool {
        self.core.unsubscribe(token)
    }

    pub(crate) fn has_subscribers(&self) -> bool {
        self.core.has_subscribers()
    }

    /// Eagerly recomputed size: the recursive sum over the live subtree.
    ///
    /// Always equals [`size`](Self::size) at quiescence; used for
    /// reconciliation and as the oracle in invariant tests.
    pub fn computed_size(&self) -> u64 {
        self.children()
            .iter()
            .map(|child| match child {
                DiskNode::File(file) => file.size(),
                DiskNode::Directory(dir) => dir.computed_size(),
            })
            .sum()
    }

    /// Eagerly recomputed descendant file count. See [`computed_size`](Self::computed_size).
    pub fn computed_count(&self) -> u64 {
        self.children()
            .iter()
            .map(|child| match child {
                DiskNode::File(_) => 1,
                DiskNode::Directory(dir) => dir.computed_count(),
            })
            .sum()
    }

    /// Bind the watch handle covering this directory's path. Valid exactly
    /// while the node is attached; released at detach.
    pub(crate) fn attach_watch(&self, handle: WatchHandle) {
        *self.watch.lock() = Some(handle);
    }

    pub(crate) fn release_watch(&self) {
        if let Some(handle) = self.watch.lock().take() {
            handle.release();
        }
    }

    /// Attach `child` under this directory at `path` (the child's absolute
    /// path), registering it in `index`, folding its weight into the
    /// ancestor accumulators, and emitting an ADD here plus a REFRESH at
    /// each subscribed ancestor.
    ///
    /// A child whose name is already taken is dropped with a warning
    /// rather than displacing the existing node — displacement would leave
    /// the displaced subtree's weight double-counted. Returns whether the
    /// child was attached.
    pub fn add_child(
        &self,
        path: PathBuf,
        child: DiskNode,
        events: &EventSink,
        index: &PathIndex,
    ) -> bool {
        {
            let mut children = self.child_nodes.write();
            if children.contains_key(child.name()) {
                warn!(
                    parent = self.name(),
                    child = child.name(),
                    "ignoring duplicate child"
                );
                return false;
            }
            child.set_parent(&self.arc());
            children.insert(CompactString::new(child.name()), child.clone());
        }
        index.insert(path, child.clone());

        let (size, count) = child.weight();
        self.apply_delta(size, count, events);

        if self.has_subscribers() {
            events.emit(NodeEvent {
                parent: self.arc(),
                child,
                kind: EventKind::Add,
            });
        }
        true
    }

    /// Detach `child` (at absolute `path`) from this directory.
    ///
    /// Directory children are detached bottom-up: every descendant's index
    /// entry is removed and its watch released first, silently — the
    /// single REMOVE event is reported here, for the subtree root, no
    /// matter how deep or wide the subtree was.
    pub fn remove_child(
        &self,
        path: &Path,
        child: &DiskNode,
        events: &EventSink,
        index: &PathIndex,
    ) {
        match child {
            DiskNode::Directory(dir) => {
                self.remove_child_directory(path, dir, events, index, false)
            }
            DiskNode::File(file) => self.remove_child_file(path, file, events, index, false),
        }
    }

    fn remove_child_directory(
        &self,
        path: &Path,
        child: &Arc<DirectoryNode>,
        events: &EventSink,
        index: &PathIndex,
        nested: bool,
    ) {
        for grandchild in child.children() {
            let grandchild_path = path.join(grandchild.name());
            match &grandchild {
                DiskNode::Directory(dir) => {
                    child.remove_child_directory(&grandchild_path, dir, events, index, true)
                }
                DiskNode::File(file) => {
                    child.remove_child_file(&grandchild_path, file, events, index, true)
                }
            }
        }
        // Index entry goes first so a racing notification cannot resolve
        // the path to a node that is about to detach.
        index.remove(path);
        child.release_watch();
        self.child_nodes.write().remove(child.name());
        if !nested {
            self.post_delete(&DiskNode::Directory(child.clone()), events);
        }
    }

    fn remove_child_file(
        &self,
        path: &Path,
        child: &Arc<FileNode>,
        events: &EventSink,
        index: &PathIndex,
        nested: bool,
    ) {
        index.remove(path);
        self.child_nodes.write().remove(child.name());
        if !nested {
            self.post_delete(&DiskNode::File(child.clone()), events);
        }
    }

    fn post_delete(&self, child: &DiskNode, events: &EventSink) {
        child.clear_parent();
        let (size, count) = child.weight();
        self.apply_delta(-size, -count, events);

        if self.has_subscribers() {
            events.emit(NodeEvent {
                parent: self.arc(),
                child: child.clone(),
                kind: EventKind::Remove,
            });
        }
    }

    /// Record a new size for a file child.
    ///
    /// A zero delta is a no-op (no event, no accumulator write) so that
    /// redundant modify notifications from the OS cannot cause event
    /// storms.
    pub fn modify_child(&self, child: &Arc<FileNode>, new_size: u64, events: &EventSink) {
        let old_size = child.size_bytes.swap(new_size, Ordering::AcqRel);
        let delta = new_size as i64 - old_size as i64;
        if delta == 0 {
            return;
        }

        self.size_bytes.fetch_add(delta, Ordering::Relaxed);
        if self.has_subscribers() {
            events.emit(NodeEvent {
                parent: self.arc(),
                child: DiskNode::File(child.clone()),
                kind: EventKind::Refresh,
            });
        }
        if let Some(parent) = self.parent() {
            parent.propagate(delta, 0, events);
        }
    }

    /// Fold a weight delta into this node (the directly affected one) and
    /// push it up the ancestor chain. No event fires here — the caller
    /// emits the structural event for this level.
    fn apply_delta(&self, size_delta: i64, count_delta: i64, events: &EventSink) {
        if size_delta == 0 && count_delta == 0 {
            return;
        }
        self.size_bytes.fetch_add(size_delta, Ordering::Relaxed);
        self.file_count.fetch_add(count_delta, Ordering::Relaxed);
        if let Some(parent) = self.parent() {
            parent.propagate(size_delta, count_delta, events);
        }
    }

    /// Ancestor leg of delta propagation: every ancestor updates its
    /// accumulators unconditionally and emits its own REFRESH only when
    /// it has subscribers of its own.
    fn propagate(&self, size_delta: i64, count_delta: i64, events: &EventSink) {
        self.size_bytes.fetch_add(size_delta, Ordering::Relaxed);
        self.file_count.fetch_add(count_delta, Ordering::Relaxed);
        if self.has_subscribers() {
            events.emit(NodeEvent {
                parent: self.arc(),
                child: DiskNode::Directory(self.arc()),
                kind: EventKind::Refresh,
            });
        }
        if let Some(parent) = self.parent() {
            parent.propagate(size_delta, count_delta, events);
        }
    }
}

impl fmt::Debug for DirectoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryNode")
            .field("name", &self.name())
            .field("size", &self.size())
            .field("count", &self.count())
            .finish()
    }
}

/// Any tree node: the closed two-variant set, as cheap-to-clone shared
/// handles.
#[derive(Clone, Debug)]
pub enum DiskNode {
    File(Arc<FileNode>),
    Directory(Arc<DirectoryNode>),
}

impl DiskNode {
    pub fn name(&self) -> &str {
        match self {
            DiskNode::File(file) => file.name(),
            DiskNode::Directory(dir) => dir.name(),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            DiskNode::File(file) => file.size(),
            DiskNode::Directory(dir) => dir.size(),
        }
    }

    pub fn parent(&self) -> Option<Arc<DirectoryNode>> {
        match self {
            DiskNode::File(file) => file.parent(),
            DiskNode::Directory(dir) => dir.parent(),
        }
    }

    /// Walk parent links to the top of the tree this node is currently
    /// attached to. A detached node is its own root.
    pub fn root(&self) -> DiskNode {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = DiskNode::Directory(parent);
        }
        current
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, DiskNode::Directory(_))
    }

    pub fn subscribe(&self, token: SubscriberToken) -> bool {
        match self {
            DiskNode::File(file) => file.subscribe(token),
            DiskNode::Directory(dir) => dir.subscribe(token),
        }
    }

    pub fn unsubscribe(&self, token: SubscriberToken) -> bool {
        match self {
            DiskNode::File(file) => file.unsubscribe(token),
            DiskNode::Directory(dir) => dir.unsubscribe(token),
        }
    }

    /// Identity comparison of the underlying allocations.
    pub fn ptr_eq(&self, other: &DiskNode) -> bool {
        match (self, other) {
            (DiskNode::File(a), DiskNode::File(b)) => Arc::ptr_eq(a, b),
            (DiskNode::Directory(a), DiskNode::Directory(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Contribution of this node to an ancestor's accumulators:
    /// `(size, file count)`.
    pub(crate) fn weight(&self) -> (i64, i64) {
        match self {
            DiskNode::File(file) => (file.size() as i64, 1),
            DiskNode::Directory(dir) => (dir.size() as i64, dir.count() as i64),
        }
    }

    fn set_parent(&self, parent: &Arc<DirectoryNode>) {
        match self {
            DiskNode::File(file) => file.core.set_parent(parent),
            DiskNode::Directory(dir) => dir.core.set_parent(parent),
        }
    }

    fn clear_parent(&self) {
        match self {
            DiskNode::File(file) => file.core.clear_parent(),
            DiskNode::Directory(dir) => dir.core.clear_parent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;

    fn fixtures() -> (EventSink, crossbeam_channel::Receiver<NodeEvent>, PathIndex) {
        let (sink, rx) = event_channel(64);
        (sink, rx, PathIndex::new())
    }

    #[test]
    fn add_child_updates_aggregates_and_parent() {
        let (events, rx, index) = fixtures();
        let dir = DirectoryNode::new("dir");
        let file = FileNode::new("file", 10);

        // Without subscribers: aggregates move, nothing is emitted.
        assert!(dir.add_child(
            PathBuf::from("dir/file"),
            DiskNode::File(file.clone()),
            &events,
            &index,
        ));
        assert_eq!(dir.children().len(), 1);
        assert_eq!(dir.size(), 10);
        assert_eq!(dir.count(), 1);
        assert!(file.parent().unwrap().name() == "dir");
        assert_eq!(index.len(), 1);
        assert!(rx.try_recv().is_err());

        // With a subscriber: one ADD for the new child.
        let token = SubscriberToken::new();
        dir.subscribe(token);
        let file2 = FileNode::new("file2", 20);
        dir.add_child(
            PathBuf::from("dir/file2"),
            DiskNode::File(file2.clone()),
            &events,
            &index,
        );
        assert_eq!(dir.size(), 30);
        assert_eq!(index.len(), 2);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::Add);
        assert!(Arc::ptr_eq(&event.parent, &dir));
        assert!(event.child.ptr_eq(&DiskNode::File(file2)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn add_directory_child_carries_subtree_weight() {
        let (events, _rx, index) = fixtures();
        let root = DirectoryNode::new("root");
        let sub = DirectoryNode::new("sub");
        sub.add_child(
            PathBuf::from("root/sub/a"),
            DiskNode::File(FileNode::new("a", 7)),
            &events,
            &index,
        );
        sub.add_child(
            PathBuf::from("root/sub/b"),
            DiskNode::File(FileNode::new("b", 5)),
            &events,
            &index,
        );

        root.add_child(
            PathBuf::from("root/sub"),
            DiskNode::Directory(sub),
            &events,
            &index,
        );
        assert_eq!(root.size(), 12);
        assert_eq!(root.count(), 2);
    }

    #[test]
    fn duplicate_child_name_is_dropped() {
        let (events, _rx, index) = fixtures();
        let dir = DirectoryNode::new("dir");
        assert!(dir.add_child(
            PathBuf::from("dir/file"),
            DiskNode::File(FileNode::new("file", 10)),
            &events,
            &index,
        ));
        assert!(!dir.add_child(
            PathBuf::from("dir/file"),
            DiskNode::File(FileNode::new("file", 99)),
            &events,
            &index,
        ));
        assert_eq!(dir.size(), 10);
        assert_eq!(dir.count(), 1);
    }

    #[test]
    fn remove_child_file_reverses_aggregates() {
        let (events, rx, index) = fixtures();
        let dir = DirectoryNode::new("dir");
        let file = FileNode::new("file", 10);
        let child = DiskNode::File(file.clone());
        dir.add_child(PathBuf::from("dir/file"), child.clone(), &events, &index);

        // Without subscribers: silent.
        dir.remove_child(Path::new("dir/file"), &child, &events, &index);
        assert!(dir.children().is_empty());
        assert_eq!(dir.size(), 0);
        assert_eq!(dir.count(), 0);
        assert!(index.is_empty());
        assert!(file.parent().is_none());
        assert!(rx.try_recv().is_err());

        // With a subscriber: exactly one REMOVE.
        dir.subscribe(SubscriberToken::new());
        dir.add_child(PathBuf::from("dir/file"), child.clone(), &events, &index);
        let _ = rx.try_recv().unwrap(); // the ADD
        dir.remove_child(Path::new("dir/file"), &child, &events, &index);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::Remove);
        assert!(event.child.ptr_eq(&child));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn nested_directory_removal_emits_single_event() {
        let (events, rx, index) = fixtures();
        let root = DirectoryNode::new("root");
        let outer = DirectoryNode::new("outer");
        let inner = DirectoryNode::new("inner");

        inner.add_child(
            PathBuf::from("root/outer/inner/deep.bin"),
            DiskNode::File(FileNode::new("deep.bin", 40)),
            &events,
            &index,
        );
        outer.add_child(
            PathBuf::from("root/outer/inner"),
            DiskNode::Directory(inner.clone()),
            &events,
            &index,
        );
        outer.add_child(
            PathBuf::from("root/outer/top.bin"),
            DiskNode::File(FileNode::new("top.bin", 2)),
            &events,
            &index,
        );
        let outer_node = DiskNode::Directory(outer.clone());
        root.add_child(
            PathBuf::from("root/outer"),
            outer_node.clone(),
            &events,
            &index,
        );
        assert_eq!(root.size(), 42);
        assert_eq!(root.count(), 2);
        assert_eq!(index.len(), 4);

        root.subscribe(SubscriberToken::new());
        root.remove_child(Path::new("root/outer"), &outer_node, &events, &index);

        assert_eq!(root.size(), 0);
        assert_eq!(root.count(), 0);
        // All descendant index entries are scrubbed with their own paths.
        assert!(index.is_empty());
        // The detached subtree root is its own root now, and still
        // internally consistent.
        assert!(outer.parent().is_none());
        assert_eq!(outer.size(), 42);
        assert!(Arc::ptr_eq(&inner.parent().unwrap(), &outer));

        // Exactly one event, at the removed subtree's former parent.
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::Remove);
        assert!(Arc::ptr_eq(&event.parent, &root));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn modify_child_propagates_delta() {
        let (events, rx, index) = fixtures();
        let root = DirectoryNode::new("root");
        let dir = DirectoryNode::new("dir");
        let file = FileNode::new("file", 10);
        dir.add_child(
            PathBuf::from("root/dir/file"),
            DiskNode::File(file.clone()),
            &events,
            &index,
        );
        root.add_child(
            PathBuf::from("root/dir"),
            DiskNode::Directory(dir.clone()),
            &events,
            &index,
        );

        dir.modify_child(&file, 100, &events);
        assert_eq!(file.size(), 100);
        assert_eq!(dir.size(), 100);
        assert_eq!(root.size(), 100);
        assert_eq!(dir.count(), 1);
        assert!(rx.try_recv().is_err());

        // Zero delta: no event, no accumulator change.
        dir.subscribe(SubscriberToken::new());
        dir.modify_child(&file, 100, &events);
        assert_eq!(dir.size(), 100);
        assert!(rx.try_recv().is_err());

        dir.modify_child(&file, 1000, &events);
        assert_eq!(dir.size(), 1000);
        assert_eq!(root.size(), 1000);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::Refresh);
        assert!(Arc::ptr_eq(&event.parent, &dir));
        assert!(event.child.ptr_eq(&DiskNode::File(file)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn ancestors_refresh_independently_of_parent_subscription() {
        let (events, rx, index) = fixtures();
        let root = DirectoryNode::new("root");
        let dir = DirectoryNode::new("dir");
        root.add_child(
            PathBuf::from("root/dir"),
            DiskNode::Directory(dir.clone()),
            &events,
            &index,
        );

        // Only the grandparent subscribes; the direct parent is silent but
        // the grandparent still sees its own REFRESH.
        root.subscribe(SubscriberToken::new());
        dir.add_child(
            PathBuf::from("root/dir/file"),
            DiskNode::File(FileNode::new("file", 10)),
            &events,
            &index,
        );

        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::Refresh);
        assert!(Arc::ptr_eq(&event.parent, &root));
        assert!(rx.try_recv().is_err());
        assert_eq!(root.size(), 10);
    }

    #[test]
    fn events_for_one_node_arrive_in_mutation_order() {
        let (events, rx, index) = fixtures();
        let dir = DirectoryNode::new("dir");
        dir.subscribe(SubscriberToken::new());

        let a = DiskNode::File(FileNode::new("a", 1));
        let b = DiskNode::File(FileNode::new("b", 2));
        dir.add_child(PathBuf::from("dir/a"), a.clone(), &events, &index);
        dir.add_child(PathBuf::from("dir/b"), b, &events, &index);
        dir.remove_child(Path::new("dir/a"), &a, &events, &index);

        let kinds: Vec<EventKind> = rx.try_iter().map(|event| event.kind).collect();
        assert_eq!(kinds, vec![EventKind::Add, EventKind::Add, EventKind::Remove]);
    }

    #[test]
    fn accumulators_agree_with_recomputation() {
        let (events, _rx, index) = fixtures();
        let root = DirectoryNode::new("root");
        let sub = DirectoryNode::new("sub");
        let file_a = FileNode::new("a", 100);
        let file_b = FileNode::new("b", 50);
        let file_c = FileNode::new("c", 7);

        root.add_child(
            PathBuf::from("root/a"),
            DiskNode::File(file_a.clone()),
            &events,
            &index,
        );
        sub.add_child(
            PathBuf::from("root/sub/b"),
            DiskNode::File(file_b.clone()),
            &events,
            &index,
        );
        root.add_child(
            PathBuf::from("root/sub"),
            DiskNode::Directory(sub.clone()),
            &events,
            &index,
        );
        sub.add_child(
            PathBuf::from("root/sub/c"),
            DiskNode::File(file_c),
            &events,
            &index,
        );
        sub.modify_child(&file_b, 500, &events);
        let b_node = DiskNode::File(file_b);
        sub.remove_child(Path::new("root/sub/b"), &b_node, &events, &index);
        root.modify_child(&file_a, 1, &events);

        assert_eq!(root.size(), root.computed_size());
        assert_eq!(root.count(), root.computed_count());
        assert_eq!(sub.size(), sub.computed_size());
        assert_eq!(sub.count(), sub.computed_count());
        assert_eq!(root.size(), 8);
        assert_eq!(root.count(), 2);
    }

    #[test]
    fn subscribe_is_idempotent() {
        let dir = DirectoryNode::new("dir");
        let token = SubscriberToken::new();
        assert!(dir.subscribe(token));
        assert!(!dir.subscribe(token));
        assert!(dir.unsubscribe(token));
        assert!(!dir.unsubscribe(token));
        assert!(!dir.has_subscribers());
    }

    #[test]
    fn root_walks_parent_links() {
        let (events, _rx, index) = fixtures();
        let root = DirectoryNode::new("root");
        let sub = DirectoryNode::new("sub");
        let file = FileNode::new("file", 1);
        sub.add_child(
            PathBuf::from("root/sub/file"),
            DiskNode::File(file.clone()),
            &events,
            &index,
        );
        root.add_child(
            PathBuf::from("root/sub"),
            DiskNode::Directory(sub),
            &events,
            &index,
        );

        let found = DiskNode::File(file).root();
        assert!(found.ptr_eq(&DiskNode::Directory(root)));
    }
}
