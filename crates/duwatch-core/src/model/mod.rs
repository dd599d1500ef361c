//! Data model for the live disk-usage tree.
//!
//! Re-exports the node types and the supporting order/formatting helpers.

pub mod node;
pub mod position;
pub mod size;

pub use node::{DirectoryNode, DiskNode, FileNode, SubscriberToken};
pub use position::insert_position;
pub use size::{format_count, format_size};
