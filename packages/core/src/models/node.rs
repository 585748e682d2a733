//! Node Data Structures
//!
//! This module defines the record shapes stored by the timeline:
//!
//! - [`Timeline`] - the root record, owns eras
//! - [`TimelineNode`] - the shared shape of eras, events and scenes
//! - [`NodeKind`] - which of the three collections a node lives in
//!
//! # Hierarchy
//!
//! ```text
//! Timeline ─┬─ Era ─┬─ Event ─┬─ Scene
//!           │       │         └─ Scene
//!           │       └─ Event
//!           └─ Era
//! ```
//!
//! Every node carries up to three independent ordering signals: a time value
//! (`time` for events and scenes, `start_time` for eras), an explicit integer
//! `order`, and a relative position (`position_relative_to` + `position_type`).
//! How those signals are reconciled lives in [`crate::ordering`].
//!
//! # Examples
//!
//! ```rust
//! use timeline_core::models::{NodeKind, TimelineNode};
//!
//! let event = TimelineNode::new(NodeKind::Event, "era-1", "Invasion of Poland")
//!     .with_time("1939-09-01");
//!
//! assert_eq!(event.order, 0);
//! assert_eq!(event.sort_time(), Some("1939-09-01"));
//! ```

use crate::models::time::TimeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The three node collections below a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Era,
    Event,
    Scene,
}

impl NodeKind {
    pub const ALL: [NodeKind; 3] = [NodeKind::Era, NodeKind::Event, NodeKind::Scene];

    /// Kind of the collection this kind's children live in
    pub fn child_kind(self) -> Option<NodeKind> {
        match self {
            NodeKind::Era => Some(NodeKind::Event),
            NodeKind::Event => Some(NodeKind::Scene),
            NodeKind::Scene => None,
        }
    }

    /// Kind of the parent collection (`None` means the parent is a [`Timeline`])
    pub fn parent_kind(self) -> Option<NodeKind> {
        match self {
            NodeKind::Era => None,
            NodeKind::Event => Some(NodeKind::Era),
            NodeKind::Scene => Some(NodeKind::Event),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Era => "era",
            NodeKind::Event => "event",
            NodeKind::Scene => "scene",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "era" => Ok(NodeKind::Era),
            "event" => Ok(NodeKind::Event),
            "scene" => Ok(NodeKind::Scene),
            other => Err(format!("unknown node kind: {other}")),
        }
    }
}

/// Which side of its anchor a relatively positioned node sits on
///
/// Any stored value other than `"before"` reads back as [`PositionType::After`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PositionType {
    Before,
    After,
}

impl PositionType {
    pub fn as_str(self) -> &'static str {
        match self {
            PositionType::Before => "before",
            PositionType::After => "after",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("before") {
            PositionType::Before
        } else {
            PositionType::After
        }
    }
}

impl From<String> for PositionType {
    fn from(value: String) -> Self {
        PositionType::parse(&value)
    }
}

impl From<PositionType> for String {
    fn from(value: PositionType) -> Self {
        value.as_str().to_string()
    }
}

/// Root record of a timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Fictional timelines accept free-form time labels on reorder;
    /// real timelines require absolute dates
    #[serde(default)]
    pub is_fictional: bool,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,
}

impl Timeline {
    pub fn new(title: impl Into<String>, is_fictional: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: String::new(),
            is_fictional,
            created_at: now,
            modified_at: now,
        }
    }
}

/// Shared record shape for eras, events and scenes.
///
/// # Fields
///
/// - `id`: generated at creation, immutable
/// - `parent_id`: timeline id (era), era id (event) or event id (scene)
/// - `time`: event/scene time; `None` defers to relative position and order
/// - `start_time` / `end_time`: era bounds; `start_time` is the era's sort time
/// - `order`: explicit tie-break / fallback sort key, defaults to 0
/// - `position_relative_to` / `position_type`: sibling anchor, only consulted
///   when the node has no time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineNode {
    pub id: String,

    pub kind: NodeKind,

    pub parent_id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub time: Option<String>,

    #[serde(default)]
    pub start_time: Option<String>,

    #[serde(default)]
    pub end_time: Option<String>,

    #[serde(default)]
    pub order: i64,

    #[serde(default)]
    pub position_relative_to: Option<String>,

    #[serde(default)]
    pub position_type: Option<PositionType>,

    #[serde(default)]
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,
}

impl TimelineNode {
    /// Create a node with a fresh UUID and `order = 0`
    pub fn new(kind: NodeKind, parent_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            parent_id: parent_id.into(),
            title: title.into(),
            description: String::new(),
            time: None,
            start_time: None,
            end_time: None,
            order: 0,
            position_relative_to: None,
            position_type: None,
            image_url: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Set the sort time (`start_time` for eras, `time` otherwise)
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.set_sort_time(Some(time.into()));
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn positioned(mut self, anchor_id: impl Into<String>, position_type: PositionType) -> Self {
        self.position_relative_to = Some(anchor_id.into());
        self.position_type = Some(position_type);
        self
    }

    /// The time value that drives ordering for this node's kind
    pub fn sort_time(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Era => self.start_time.as_deref(),
            NodeKind::Event | NodeKind::Scene => self.time.as_deref(),
        }
    }

    pub fn set_sort_time(&mut self, time: Option<String>) {
        match self.kind {
            NodeKind::Era => self.start_time = time,
            NodeKind::Event | NodeKind::Scene => self.time = time,
        }
    }

    pub fn time_value(&self) -> TimeValue {
        TimeValue::classify(self.sort_time())
    }

    pub fn is_timed(&self) -> bool {
        !self.time_value().is_empty()
    }

    /// Relative anchor, ignored when the node is timed
    pub fn relative_anchor(&self) -> Option<(&str, PositionType)> {
        let anchor = self.position_relative_to.as_deref()?;
        if anchor.is_empty() {
            return None;
        }
        Some((anchor, self.position_type.unwrap_or(PositionType::After)))
    }
}

/// Fields supplied when creating a node through the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    pub parent_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub position_relative_to: Option<String>,
    #[serde(default)]
    pub position_type: Option<PositionType>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewNode {
    pub fn under(parent_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Sparse update for a node
///
/// `None` leaves a field untouched. For nullable fields the inner option
/// distinguishes "set to value" (`Some(Some(v))`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub parent_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub time: Option<Option<String>>,
    pub start_time: Option<Option<String>>,
    pub end_time: Option<Option<String>>,
    pub order: Option<i64>,
    pub position_relative_to: Option<Option<String>>,
    pub position_type: Option<Option<PositionType>>,
    pub image_url: Option<Option<String>>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_relative_position(mut self, anchor: Option<(String, PositionType)>) -> Self {
        match anchor {
            Some((id, position_type)) => {
                self.position_relative_to = Some(Some(id));
                self.position_type = Some(Some(position_type));
            }
            None => {
                self.position_relative_to = Some(None);
                self.position_type = Some(None);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge this patch into `node`. Does not touch `modified_at`.
    pub fn apply_to(self, node: &mut TimelineNode) {
        if let Some(parent_id) = self.parent_id {
            node.parent_id = parent_id;
        }
        if let Some(title) = self.title {
            node.title = title;
        }
        if let Some(description) = self.description {
            node.description = description;
        }
        if let Some(time) = self.time {
            node.time = time;
        }
        if let Some(start_time) = self.start_time {
            node.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            node.end_time = end_time;
        }
        if let Some(order) = self.order {
            node.order = order;
        }
        if let Some(anchor) = self.position_relative_to {
            node.position_relative_to = anchor;
        }
        if let Some(position_type) = self.position_type {
            node.position_type = position_type;
        }
        if let Some(image_url) = self.image_url {
            node.image_url = image_url;
        }
    }
}

/// Outcome of a cascade delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Whether the addressed record existed
    pub existed: bool,
    /// Records removed, including descendants
    pub deleted_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_node_defaults() {
        let node = TimelineNode::new(NodeKind::Scene, "event-1", "Opening");
        assert_eq!(node.order, 0);
        assert_eq!(node.parent_id, "event-1");
        assert!(node.time.is_none());
        assert!(node.relative_anchor().is_none());
        assert!(Uuid::parse_str(&node.id).is_ok());
    }

    #[test]
    fn test_era_sort_time_uses_start_time() {
        let era = TimelineNode::new(NodeKind::Era, "t-1", "War").with_time("1939");
        assert_eq!(era.start_time.as_deref(), Some("1939"));
        assert!(era.time.is_none());
        assert_eq!(era.sort_time(), Some("1939"));
    }

    #[test]
    fn test_position_type_reads_unknown_as_after() {
        let before: PositionType = serde_json::from_value(json!("before")).unwrap();
        let after: PositionType = serde_json::from_value(json!("after")).unwrap();
        let other: PositionType = serde_json::from_value(json!("beside")).unwrap();
        assert_eq!(before, PositionType::Before);
        assert_eq!(after, PositionType::After);
        assert_eq!(other, PositionType::After);
        assert_eq!(serde_json::to_value(PositionType::Before).unwrap(), json!("before"));
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let node = TimelineNode::new(NodeKind::Event, "era-1", "Event")
            .positioned("other", PositionType::Before);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["parentId"], json!("era-1"));
        assert_eq!(value["positionRelativeTo"], json!("other"));
        assert_eq!(value["positionType"], json!("before"));
        assert_eq!(value["kind"], json!("event"));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let node: TimelineNode = serde_json::from_value(json!({
            "id": "n-1",
            "kind": "scene",
            "parentId": "event-1",
            "createdAt": "2025-01-01T00:00:00Z",
            "modifiedAt": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(node.order, 0);
        assert_eq!(node.title, "");
        assert!(node.position_type.is_none());
    }

    #[test]
    fn test_node_update_apply() {
        let mut node = TimelineNode::new(NodeKind::Event, "era-1", "Event")
            .with_time("2024-01-01")
            .positioned("x", PositionType::After);

        NodeUpdate {
            time: Some(None),
            order: Some(7),
            ..Default::default()
        }
        .with_relative_position(None)
        .apply_to(&mut node);

        assert!(node.time.is_none());
        assert_eq!(node.order, 7);
        assert!(node.position_relative_to.is_none());
        assert_eq!(node.title, "Event");
    }

    #[test]
    fn test_kind_hierarchy() {
        assert_eq!(NodeKind::Era.child_kind(), Some(NodeKind::Event));
        assert_eq!(NodeKind::Scene.child_kind(), None);
        assert_eq!(NodeKind::Event.parent_kind(), Some(NodeKind::Era));
        assert_eq!(NodeKind::Era.parent_kind(), None);
        assert_eq!("Scene".parse::<NodeKind>().unwrap(), NodeKind::Scene);
        assert!("timeline".parse::<NodeKind>().is_err());
    }
}
