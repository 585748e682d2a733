//! Timeline Service - mutation and reorder coordination
//!
//! `TimelineService` is the single owner of timeline writes. Every operation
//! follows the same shape: read the current collection from the
//! [`NodeStore`], compute the change (consulting [`crate::ordering`] where
//! positions matter), then write the collection back.
//!
//! # Concurrency
//!
//! There is no in-process locking. Each operation is a read → compute → write
//! sequence whose only suspension points are store calls. Two writers issuing
//! overlapping operations on the same collection race, and the last
//! `replace_all` wins. Callers are expected to issue one mutation at a time.
//!
//! # Examples
//!
//! ```rust
//! use timeline_core::db::MemoryStore;
//! use timeline_core::models::{NewNode, NodeKind};
//! use timeline_core::services::TimelineService;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = TimelineService::new(Arc::new(MemoryStore::new()));
//!
//! let timeline = service.create_timeline("World War II", false).await?;
//! let era = service
//!     .create_node(NodeKind::Era, NewNode::under(&timeline.id, "Early war"))
//!     .await?;
//!
//! let mut fields = NewNode::under(&era.id, "Invasion of Poland");
//! fields.time = Some("1939-09-01".to_string());
//! service.create_node(NodeKind::Event, fields).await?;
//!
//! let events = service.ordered_children(NodeKind::Event, &era.id).await?;
//! assert_eq!(events.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::config::TimelineConfig;
use crate::db::{DomainEvent, NodeStore, ReorderedNode};
use crate::models::time::{parse_absolute, SystemTimeProvider, TimeProvider};
use crate::models::{
    EraBranch, EventBranch, NewNode, NodeKind, NodeUpdate, PositionType, Timeline,
    TimelineNode, TimelineTree,
};
use crate::ordering::{order_siblings, renumber, renumber_spaced, splice_out, OrderCalculator};
use crate::services::TimelineServiceError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Drop target of a drag-and-drop reorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderTarget {
    /// Sibling the node was dropped next to
    pub sibling_id: String,

    /// Which side of the sibling the node was dropped on
    pub edge: PositionType,

    /// Destination parent, used when `sibling_id` no longer exists
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl ReorderTarget {
    pub fn before(sibling_id: impl Into<String>) -> Self {
        Self {
            sibling_id: sibling_id.into(),
            edge: PositionType::Before,
            parent_id: None,
        }
    }

    pub fn after(sibling_id: impl Into<String>) -> Self {
        Self {
            sibling_id: sibling_id.into(),
            edge: PositionType::After,
            parent_id: None,
        }
    }

    /// Destination parent to fall back on if the sibling has been deleted
    pub fn in_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Writes for one drop, applied in a single collection rewrite
struct ReorderPlan {
    /// Changes to the dragged node
    patch: NodeUpdate,

    /// Renumbered destination orders and re-pointed anchors, by sibling id
    siblings: HashMap<String, NodeUpdate>,
}

/// Coordinates creates, updates, reorders and deletes over a [`NodeStore`]
#[derive(Clone)]
pub struct TimelineService {
    /// Storage collaborator for all persistence operations
    pub(crate) store: Arc<dyn NodeStore>,

    /// Clock used for `created_at` / `modified_at`
    pub(crate) clock: Arc<dyn TimeProvider>,

    /// Broadcast channel for domain events
    event_tx: broadcast::Sender<DomainEvent>,

    /// Require real dates when a drop on a non-fictional timeline supplies a time
    enforce_absolute_time: bool,
}

impl TimelineService {
    /// Create a service with default configuration
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        let config = TimelineConfig::default();
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        Self {
            store,
            clock: Arc::new(SystemTimeProvider),
            event_tx,
            enforce_absolute_time: config.enforce_absolute_time_on_real_timelines,
        }
    }

    /// Create a service from validated configuration
    pub fn with_config(
        store: Arc<dyn NodeStore>,
        config: &TimelineConfig,
    ) -> Result<Self, TimelineServiceError> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        Ok(Self {
            store,
            clock: Arc::new(SystemTimeProvider),
            event_tx,
            enforce_absolute_time: config.enforce_absolute_time_on_real_timelines,
        })
    }

    /// Replace the clock (tests pin time with `FixedTimeProvider`)
    pub fn with_time_provider(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// Get access to the underlying store
    pub fn store(&self) -> &Arc<dyn NodeStore> {
        &self.store
    }

    /// Subscribe to domain events emitted after successful writes
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// Ignores send errors; having no subscribers is normal
    pub(crate) fn emit_event(&self, event: DomainEvent) {
        tracing::debug!("Emitting {}", event.event_type());
        let _ = self.event_tx.send(event);
    }

    //
    // TIMELINES
    //

    /// Create a timeline root
    pub async fn create_timeline(
        &self,
        title: impl Into<String>,
        is_fictional: bool,
    ) -> Result<Timeline, TimelineServiceError> {
        let now = self.clock.now();
        let timeline = Timeline {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: String::new(),
            is_fictional,
            created_at: now,
            modified_at: now,
        };
        self.store.upsert_timeline(timeline.clone()).await?;
        tracing::info!("Created timeline '{}' ({})", timeline.title, timeline.id);
        self.emit_event(DomainEvent::TimelineSaved(timeline.clone()));
        Ok(timeline)
    }

    pub async fn get_timeline(&self, id: &str) -> Result<Option<Timeline>, TimelineServiceError> {
        Ok(self.store.get_timeline(id).await?)
    }

    pub async fn list_timelines(&self) -> Result<Vec<Timeline>, TimelineServiceError> {
        Ok(self.store.list_timelines().await?)
    }

    /// Bump a timeline's `modified_at`, the newest-wins sync key
    pub(crate) async fn touch_timeline(&self, timeline_id: &str) -> Result<(), TimelineServiceError> {
        if let Some(mut timeline) = self.store.get_timeline(timeline_id).await? {
            timeline.modified_at = self.clock.now();
            self.store.upsert_timeline(timeline).await?;
        }
        Ok(())
    }

    /// Resolve the timeline owning a node, walking up the parent chain
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node itself doesn't exist
    /// - `OrphanReference` if an ancestor (or the timeline) is missing
    pub async fn resolve_timeline_id(
        &self,
        kind: NodeKind,
        id: &str,
    ) -> Result<String, TimelineServiceError> {
        let node = self
            .store
            .get_by_id(kind, id)
            .await?
            .ok_or_else(|| TimelineServiceError::node_not_found(kind, id))?;
        self.timeline_for_parent(kind, &node.id, &node.parent_id).await
    }

    /// Timeline owning a (prospective) node of `kind` under `parent_id`
    pub(crate) async fn timeline_for_parent(
        &self,
        kind: NodeKind,
        id: &str,
        parent_id: &str,
    ) -> Result<String, TimelineServiceError> {
        let mut kind = kind;
        let mut id = id.to_string();
        let mut parent_id = parent_id.to_string();
        loop {
            match kind.parent_kind() {
                None => {
                    return match self.store.get_timeline(&parent_id).await? {
                        Some(timeline) => Ok(timeline.id),
                        None => Err(TimelineServiceError::orphan_reference(
                            kind,
                            id,
                            format!("timeline {parent_id}"),
                        )),
                    };
                }
                Some(parent_kind) => {
                    let parent = self
                        .store
                        .get_by_id(parent_kind, &parent_id)
                        .await?
                        .ok_or_else(|| {
                            TimelineServiceError::orphan_reference(
                                kind,
                                id.clone(),
                                format!("{parent_kind} {parent_id}"),
                            )
                        })?;
                    kind = parent_kind;
                    id = parent.id;
                    parent_id = parent.parent_id;
                }
            }
        }
    }

    /// Check that `parent_id` names an existing parent for a node of `kind`
    async fn parent_exists(&self, kind: NodeKind, parent_id: &str) -> Result<bool, TimelineServiceError> {
        Ok(match kind.parent_kind() {
            None => self.store.get_timeline(parent_id).await?.is_some(),
            Some(parent_kind) => self.store.get_by_id(parent_kind, parent_id).await?.is_some(),
        })
    }

    //
    // NODES
    //

    /// Create an era, event or scene
    ///
    /// Generates the id, defaults `order` to 0 and appends the node to its
    /// collection. A relative anchor that doesn't name a sibling is kept as-is;
    /// ordering falls back to append for it.
    ///
    /// # Errors
    ///
    /// `InvalidParent` if `fields.parent_id` doesn't reference a live parent.
    pub async fn create_node(
        &self,
        kind: NodeKind,
        fields: NewNode,
    ) -> Result<TimelineNode, TimelineServiceError> {
        if !self.parent_exists(kind, &fields.parent_id).await? {
            return Err(TimelineServiceError::invalid_parent(kind, fields.parent_id));
        }

        let now = self.clock.now();
        let position_relative_to = fields.position_relative_to.filter(|id| !id.is_empty());
        let position_type = position_relative_to.as_ref().and(fields.position_type);

        let node = TimelineNode {
            id: Uuid::new_v4().to_string(),
            kind,
            parent_id: fields.parent_id,
            title: fields.title,
            description: fields.description,
            time: fields.time,
            start_time: fields.start_time,
            end_time: fields.end_time,
            order: fields.order.unwrap_or(0),
            position_relative_to,
            position_type,
            image_url: fields.image_url,
            created_at: now,
            modified_at: now,
        };

        if let Some(anchor) = node.position_relative_to.as_deref() {
            let anchor_is_sibling = self
                .store
                .get_by_id(kind, anchor)
                .await?
                .is_some_and(|sibling| sibling.parent_id == node.parent_id);
            if !anchor_is_sibling {
                tracing::warn!(
                    "{} '{}' anchored to '{}', which is not a sibling; it will render at the end",
                    kind,
                    node.id,
                    anchor
                );
            }
        }

        self.store.insert(node.clone()).await?;
        tracing::debug!("Created {} '{}' under '{}'", kind, node.id, node.parent_id);

        match self.timeline_for_parent(kind, &node.id, &node.parent_id).await {
            Ok(timeline_id) => self.touch_timeline(&timeline_id).await?,
            Err(e) => tracing::warn!("Created node outside a reachable timeline: {}", e),
        }

        self.emit_event(DomainEvent::NodeCreated(node.clone()));
        Ok(node)
    }

    pub async fn get_node(
        &self,
        kind: NodeKind,
        id: &str,
    ) -> Result<Option<TimelineNode>, TimelineServiceError> {
        Ok(self.store.get_by_id(kind, id).await?)
    }

    /// Merge a sparse patch into a node and persist the collection
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node doesn't exist (nothing is written)
    /// - `InvalidParent` if the patch reparents under a missing parent
    pub async fn update_fields(
        &self,
        kind: NodeKind,
        id: &str,
        patch: NodeUpdate,
    ) -> Result<TimelineNode, TimelineServiceError> {
        let updated = self.write_patch(kind, id, patch).await?;
        self.touch_owning_timeline(kind, &updated).await?;
        self.emit_event(DomainEvent::NodeUpdated(updated.clone()));
        Ok(updated)
    }

    /// Apply `patch` with a whole-collection rewrite, without events
    async fn write_patch(
        &self,
        kind: NodeKind,
        id: &str,
        patch: NodeUpdate,
    ) -> Result<TimelineNode, TimelineServiceError> {
        self.write_changes(kind, id, patch, HashMap::new()).await
    }

    /// Apply `patch` to `id` and `siblings` to other nodes of the same
    /// collection in one rewrite, without events
    async fn write_changes(
        &self,
        kind: NodeKind,
        id: &str,
        patch: NodeUpdate,
        mut siblings: HashMap<String, NodeUpdate>,
    ) -> Result<TimelineNode, TimelineServiceError> {
        if let Some(parent_id) = patch.parent_id.as_deref() {
            if !self.parent_exists(kind, parent_id).await? {
                return Err(TimelineServiceError::invalid_parent(kind, parent_id));
            }
        }

        let mut collection = self.store.list_all(kind).await?;
        let index = collection
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| TimelineServiceError::node_not_found(kind, id))?;

        let now = self.clock.now();
        let mut adjusted = 0;
        for (position, node) in collection.iter_mut().enumerate() {
            if position == index {
                continue;
            }
            if let Some(change) = siblings.remove(&node.id) {
                let before = node.clone();
                change.apply_to(node);
                if *node != before {
                    node.modified_at = now;
                    adjusted += 1;
                }
            }
        }

        let node = &mut collection[index];
        patch.apply_to(node);
        node.modified_at = now;
        let updated = node.clone();

        self.store.replace_all(kind, collection).await?;
        tracing::debug!("Updated {} '{}' ({} siblings adjusted)", kind, id, adjusted);
        Ok(updated)
    }

    async fn touch_owning_timeline(
        &self,
        kind: NodeKind,
        node: &TimelineNode,
    ) -> Result<(), TimelineServiceError> {
        match self.timeline_for_parent(kind, &node.id, &node.parent_id).await {
            Ok(timeline_id) => self.touch_timeline(&timeline_id).await,
            Err(e) => {
                tracing::warn!("Cannot stamp owning timeline: {}", e);
                Ok(())
            }
        }
    }

    /// Children of `parent_id` in rendered order
    pub async fn ordered_children(
        &self,
        kind: NodeKind,
        parent_id: &str,
    ) -> Result<Vec<TimelineNode>, TimelineServiceError> {
        let siblings = self.store.list_by_parent(kind, parent_id).await?;
        Ok(order_siblings(siblings))
    }

    /// A whole timeline in rendered order
    pub async fn timeline_tree(
        &self,
        timeline_id: &str,
    ) -> Result<TimelineTree, TimelineServiceError> {
        let timeline = self
            .store
            .get_timeline(timeline_id)
            .await?
            .ok_or_else(|| TimelineServiceError::timeline_not_found(timeline_id))?;

        let mut eras = Vec::new();
        for era in self.ordered_children(NodeKind::Era, timeline_id).await? {
            let mut events = Vec::new();
            for event in self.ordered_children(NodeKind::Event, &era.id).await? {
                let scenes = self.ordered_children(NodeKind::Scene, &event.id).await?;
                events.push(EventBranch { event, scenes });
            }
            eras.push(EraBranch { era, events });
        }

        Ok(TimelineTree { timeline, eras })
    }

    /// Renumber siblings' `order` to their rendered positions `0..n`
    ///
    /// Rendering is unchanged; explicit orders stop colliding. Returns the
    /// siblings in rendered order.
    pub async fn normalize_order(
        &self,
        kind: NodeKind,
        parent_id: &str,
    ) -> Result<Vec<TimelineNode>, TimelineServiceError> {
        let mut ordered = self.ordered_children(kind, parent_id).await?;
        let orders: Vec<i64> = ordered.iter().map(|n| n.order).collect();
        if !OrderCalculator::needs_rebalancing(&orders) {
            return Ok(ordered);
        }

        renumber(&mut ordered);
        let now = self.clock.now();
        let mut collection = self.store.list_all(kind).await?;
        for node in collection.iter_mut() {
            if let Some(renumbered) = ordered.iter_mut().find(|n| n.id == node.id) {
                node.order = renumbered.order;
                node.modified_at = now;
                renumbered.modified_at = now;
            }
        }
        self.store.replace_all(kind, collection).await?;
        tracing::debug!("Rebalanced {} {}s under '{}'", ordered.len(), kind, parent_id);
        Ok(ordered)
    }

    /// Move a node next to a sibling after a drag-and-drop
    ///
    /// The destination siblings are first renumbered to their rendered
    /// positions, two apart. The new `order` is the target's renumbered order
    /// minus one (`Before`) or plus one (`After`), so it falls strictly between
    /// the target and its neighbour. An untimed node is also anchored to the
    /// target so it renders beside it even among timed siblings. Dropping next
    /// to a sibling under another parent reparents the node.
    ///
    /// Siblings anchored to the dragged node are re-anchored to its rendered
    /// neighbours first, so they stay put instead of following it. All of this
    /// is one collection rewrite.
    ///
    /// If the target sibling no longer exists the node is appended to the end
    /// of the destination sibling list (`target.parent_id`, or its current
    /// parent) instead of failing.
    ///
    /// # Errors
    ///
    /// `NotFound` if the dragged node doesn't exist; nothing is written.
    pub async fn reorder(
        &self,
        kind: NodeKind,
        id: &str,
        target: ReorderTarget,
    ) -> Result<TimelineNode, TimelineServiceError> {
        let node = self
            .store
            .get_by_id(kind, id)
            .await?
            .ok_or_else(|| TimelineServiceError::node_not_found(kind, id))?;

        let plan = self.plan_reorder(kind, &node, &target, None).await?;
        self.commit_reorder(kind, node, plan).await
    }

    /// Reorder and set the node's time in the same write
    ///
    /// Used when the destination expects timed entries. On a non-fictional
    /// timeline the time must be an absolute date (unless disabled in config);
    /// fictional timelines accept any non-empty label.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the dragged node doesn't exist
    /// - `InvalidTimeValue` if the time is empty, or not a date where one is required
    pub async fn reorder_with_date_change(
        &self,
        kind: NodeKind,
        id: &str,
        target: ReorderTarget,
        new_time: &str,
    ) -> Result<TimelineNode, TimelineServiceError> {
        let node = self
            .store
            .get_by_id(kind, id)
            .await?
            .ok_or_else(|| TimelineServiceError::node_not_found(kind, id))?;

        if new_time.trim().is_empty() {
            return Err(TimelineServiceError::invalid_time(new_time));
        }

        let plan = self
            .plan_reorder(kind, &node, &target, Some(new_time.to_string()))
            .await?;

        if self.enforce_absolute_time {
            let destination = plan.patch.parent_id.as_deref().unwrap_or(&node.parent_id);
            let timeline_id = self.timeline_for_parent(kind, &node.id, destination).await?;
            let is_fictional = self
                .store
                .get_timeline(&timeline_id)
                .await?
                .is_some_and(|t| t.is_fictional);
            if !is_fictional && parse_absolute(new_time).is_none() {
                return Err(TimelineServiceError::invalid_time(new_time));
            }
        }

        self.commit_reorder(kind, node, plan).await
    }

    /// Compute every write a drop needs; reads only
    async fn plan_reorder(
        &self,
        kind: NodeKind,
        node: &TimelineNode,
        target: &ReorderTarget,
        new_time: Option<String>,
    ) -> Result<ReorderPlan, TimelineServiceError> {
        let mut patch = NodeUpdate::new();
        let sets_time = new_time.is_some();
        let will_be_timed = sets_time || node.is_timed();

        if let Some(time) = new_time {
            match kind {
                NodeKind::Era => patch.start_time = Some(Some(time)),
                NodeKind::Event | NodeKind::Scene => patch.time = Some(Some(time)),
            }
        }

        // Dropped onto itself: position is unchanged
        if target.sibling_id == node.id {
            if sets_time {
                patch = patch.with_relative_position(None);
            }
            return Ok(ReorderPlan {
                patch,
                siblings: HashMap::new(),
            });
        }

        // Nodes anchored to the dragged one stay where they render
        let source = self.ordered_children(kind, &node.parent_id).await?;
        let mut siblings: HashMap<String, NodeUpdate> =
            splice_out(&source, &node.id).into_iter().collect();

        let destination = match self.store.get_by_id(kind, &target.sibling_id).await? {
            Some(target_node) => {
                let destination = target_node.parent_id.clone();
                let mut rendered: Vec<TimelineNode> = self
                    .ordered_children(kind, &destination)
                    .await?
                    .into_iter()
                    .filter(|n| n.id != node.id)
                    .collect();
                renumber_spaced(&mut rendered);

                let mut target_order = target_node.order;
                for sibling in &rendered {
                    if sibling.id == target_node.id {
                        target_order = sibling.order;
                    }
                    siblings.entry(sibling.id.clone()).or_default().order = Some(sibling.order);
                }

                patch.order = Some(OrderCalculator::order_for_drop(target_order, target.edge));
                patch = if will_be_timed {
                    patch.with_relative_position(None)
                } else {
                    patch.with_relative_position(Some((target_node.id.clone(), target.edge)))
                };
                destination
            }
            None => {
                let destination = target
                    .parent_id
                    .clone()
                    .unwrap_or_else(|| node.parent_id.clone());
                tracing::warn!(
                    "Reorder target {} '{}' no longer exists; appending '{}' under '{}'",
                    kind,
                    target.sibling_id,
                    node.id,
                    destination
                );

                let remaining: Vec<TimelineNode> = self
                    .store
                    .list_by_parent(kind, &destination)
                    .await?
                    .into_iter()
                    .filter(|n| n.id != node.id)
                    .collect();
                patch.order = Some(OrderCalculator::order_for_append(&remaining));
                patch = patch.with_relative_position(None);
                destination
            }
        };

        if destination != node.parent_id {
            patch = patch.with_parent(destination);
        }
        Ok(ReorderPlan { patch, siblings })
    }

    async fn commit_reorder(
        &self,
        kind: NodeKind,
        node: TimelineNode,
        plan: ReorderPlan,
    ) -> Result<TimelineNode, TimelineServiceError> {
        let previous_parent_id = node.parent_id;
        let updated = self
            .write_changes(kind, &node.id, plan.patch, plan.siblings)
            .await?;

        tracing::debug!(
            "Reordered {} '{}' to order {} under '{}'",
            kind,
            updated.id,
            updated.order,
            updated.parent_id
        );

        self.touch_owning_timeline(kind, &updated).await?;
        self.emit_event(DomainEvent::NodeReordered(ReorderedNode {
            kind,
            id: updated.id.clone(),
            previous_parent_id,
            parent_id: updated.parent_id.clone(),
            order: updated.order,
        }));
        Ok(updated)
    }
}
