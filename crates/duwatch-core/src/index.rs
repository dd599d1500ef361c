//! Path → node index.
//!
//! Resolves absolute filesystem paths from OS notifications to live tree
//! nodes. Owned by the watch domain and injected into the scanner, the
//! bridge, and the node model rather than living as ambient global state.
//!
//! Consistency rule: a removed node's entry is deleted from this index
//! before the node's detach from its parent becomes observable, so a
//! concurrent create notification cannot resolve a path to a node that is
//! about to disappear.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::model::DiskNode;

/// Concurrent map from absolute path to live node. Every attached node
/// with a distinct filesystem path has exactly one entry.
#[derive(Default)]
pub struct PathIndex {
    map: RwLock<HashMap<PathBuf, DiskNode>>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: PathBuf, node: DiskNode) {
        self.map.write().insert(path, node);
    }

    pub fn get(&self, path: &Path) -> Option<DiskNode> {
        self.map.read().get(path).cloned()
    }

    pub fn remove(&self, path: &Path) -> Option<DiskNode> {
        self.map.write().remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.map.read().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}
