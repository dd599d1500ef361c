//! duwatch-core — live disk-usage tree engine.
//!
//! Maintains an in-memory tree mirroring a directory subtree, aggregates
//! file sizes and counts bottom-up, and keeps the tree synchronized with
//! filesystem mutations observed through OS change notifications.
//! Consumers subscribe to individual nodes and re-render incrementally
//! from typed ADD/REMOVE/REFRESH events instead of re-scanning.
//!
//! This crate contains the whole engine with zero UI dependencies; any
//! rendering or reporting layer is an external consumer of the node
//! accessors and the event stream.
//!
//! # Modules
//!
//! - [`model`] — node types, aggregation primitives, order/format helpers.
//! - [`events`] — the typed event bus with bounded, drop-newest delivery.
//! - [`index`] — path → node resolution for notification processing.
//! - [`scanner`] — the initial recursive walk and subtree scans.
//! - [`monitor`] — the watch bridge translating notifications to mutations.
//! - [`watch`] — ownership of the OS watch resource.
//! - [`live`] — the entry point: start a domain, get a handle, shut down.

pub mod error;
pub mod events;
pub mod index;
pub mod live;
pub mod model;
pub mod monitor;
pub mod scanner;
pub mod watch;

pub use error::Error;
pub use events::{EventKind, EventSink, NodeEvent};
pub use index::PathIndex;
pub use live::{start, start_with, LiveHandle, LiveOptions};
pub use model::{DirectoryNode, DiskNode, FileNode, SubscriberToken};
pub use scanner::{ScanPolicy, ScanProgress, ScanStats};
