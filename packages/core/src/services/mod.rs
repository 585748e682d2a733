//! Business Services
//!
//! This module contains the timeline's coordination logic:
//!
//! - `TimelineService` - creates, updates and drag-and-drop reorders
//! - `cascade` - subtree deletion and orphan sweeping
//! - `snapshot` - whole-timeline export/apply for sync collaborators
//!
//! Services sit between the storage layer and callers: they read collections
//! from a [`crate::db::NodeStore`], consult [`crate::ordering`], and write back.

mod cascade;
pub mod error;
pub mod snapshot;
pub mod timeline_service;


pub use error::TimelineServiceError;
pub use snapshot::{resolve_newest, SyncDecision, TimelineSnapshot};
pub use timeline_service::{ReorderTarget, TimelineService};
