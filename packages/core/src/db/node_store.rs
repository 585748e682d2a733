//! NodeStore Trait - Storage Abstraction Layer
//!
//! This module defines the `NodeStore` trait that abstracts persistence for the
//! timeline collections. Business logic in [`crate::services::TimelineService`]
//! only ever talks to this trait, so the persistence medium (in-memory, local
//! JSON file, a remote document store) is opaque to it.
//!
//! # Design Decisions
//!
//! 1. **Type-partitioned**: eras, events and scenes are separate collections
//!    addressed by [`NodeKind`]; timelines have their own collection
//! 2. **No ordering or validation**: stores return nodes in insertion order and
//!    never interpret ordering signals
//! 3. **Whole-collection rewrite**: `replace_all` is the only update primitive,
//!    matching collaborators that cannot patch a single record
//! 4. **Async-first**: every method is async so file and network backends fit
//!
//! # Examples
//!
//! ```rust
//! use timeline_core::db::{MemoryStore, NodeStore};
//! use timeline_core::models::{NodeKind, TimelineNode};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store: Arc<dyn NodeStore> = Arc::new(MemoryStore::new());
//!
//! let era = TimelineNode::new(NodeKind::Era, "timeline-1", "Antiquity");
//! store.insert(era.clone()).await?;
//!
//! let eras = store.list_by_parent(NodeKind::Era, "timeline-1").await?;
//! assert_eq!(eras.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::db::StoreError;
use crate::models::{NodeKind, Timeline, TimelineNode};
use async_trait::async_trait;

/// Abstraction layer for timeline persistence operations
///
/// Implementations must be `Send + Sync`; the service holds them as
/// `Arc<dyn NodeStore>`.
#[async_trait]
pub trait NodeStore: Send + Sync {
    //
    // NODE COLLECTIONS
    //

    /// All nodes of `kind` whose `parent_id` equals `parent_id`, in insertion order
    async fn list_by_parent(
        &self,
        kind: NodeKind,
        parent_id: &str,
    ) -> Result<Vec<TimelineNode>, StoreError>;

    /// The whole collection for `kind`, in insertion order
    async fn list_all(&self, kind: NodeKind) -> Result<Vec<TimelineNode>, StoreError>;

    /// Get a node by id
    ///
    /// - `Ok(Some(node))` if the node exists
    /// - `Ok(None)` if it does not (not an error)
    async fn get_by_id(&self, kind: NodeKind, id: &str)
        -> Result<Option<TimelineNode>, StoreError>;

    /// Append a node to its collection
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if the id already exists in the collection.
    async fn insert(&self, node: TimelineNode) -> Result<(), StoreError>;

    /// Replace the whole collection for `kind`
    ///
    /// Every node in `nodes` must have `kind == kind`; the previous contents
    /// are discarded. Concurrent writers race: the last `replace_all` wins.
    async fn replace_all(&self, kind: NodeKind, nodes: Vec<TimelineNode>)
        -> Result<(), StoreError>;

    /// Remove a node by id, returning whether it existed
    async fn remove_by_id(&self, kind: NodeKind, id: &str) -> Result<bool, StoreError>;

    //
    // TIMELINES
    //

    async fn list_timelines(&self) -> Result<Vec<Timeline>, StoreError>;

    async fn get_timeline(&self, id: &str) -> Result<Option<Timeline>, StoreError>;

    /// Insert a timeline, or replace the record with the same id
    async fn upsert_timeline(&self, timeline: Timeline) -> Result<(), StoreError>;

    async fn remove_timeline(&self, id: &str) -> Result<bool, StoreError>;
}
