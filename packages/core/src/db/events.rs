//! Domain Events
//!
//! Events emitted by [`crate::services::TimelineService`] after a write has
//! been persisted. Subscribers (a UI layer, a sync collaborator) receive them
//! through a tokio broadcast channel and re-query ordered children as needed;
//! events never carry ordering decisions themselves.

use crate::models::{NodeKind, Timeline, TimelineNode};
use serde::{Deserialize, Serialize};

/// Payload describing a node that moved within or across sibling sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderedNode {
    pub kind: NodeKind,
    pub id: String,
    pub previous_parent_id: String,
    pub parent_id: String,
    pub order: i64,
}

/// Domain events emitted after successful writes
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A timeline root was created or its fields changed
    TimelineSaved(Timeline),

    /// A node was created
    NodeCreated(TimelineNode),

    /// A node's fields were updated
    NodeUpdated(TimelineNode),

    /// A node was moved by drag-and-drop
    NodeReordered(ReorderedNode),

    /// A node (or timeline) and its descendants were removed
    SubtreeDeleted {
        kind: Option<NodeKind>,
        id: String,
        deleted_count: usize,
    },

    /// A timeline's entire subtree was replaced by a snapshot
    TimelineReplaced { timeline_id: String },
}

impl DomainEvent {
    /// Get a string representation of the event type, for logging and forwarding
    pub fn event_type(&self) -> &str {
        match self {
            DomainEvent::TimelineSaved(_) => "timeline:saved",
            DomainEvent::NodeCreated(_) => "node:created",
            DomainEvent::NodeUpdated(_) => "node:updated",
            DomainEvent::NodeReordered(_) => "node:reordered",
            DomainEvent::SubtreeDeleted { .. } => "subtree:deleted",
            DomainEvent::TimelineReplaced { .. } => "timeline:replaced",
        }
    }
}
