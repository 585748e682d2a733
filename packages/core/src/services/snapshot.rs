//! Whole-timeline snapshots for sync collaborators
//!
//! A sync layer exchanges [`TimelineSnapshot`]s: one timeline record plus its
//! complete subtree. Conflicts are settled at timeline granularity by
//! [`resolve_newest`]; the side with the later `updated_at` wins outright and
//! no field-level merge is attempted.

use crate::db::DomainEvent;
use crate::models::{NodeKind, Timeline, TimelineNode};
use crate::services::{TimelineService, TimelineServiceError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A timeline and its full subtree, in store order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    pub timeline: Timeline,
    #[serde(default)]
    pub eras: Vec<TimelineNode>,
    #[serde(default)]
    pub events: Vec<TimelineNode>,
    #[serde(default)]
    pub scenes: Vec<TimelineNode>,
    /// Conflict key; the timeline's `modified_at` at export time
    pub updated_at: DateTime<Utc>,
}

impl TimelineSnapshot {
    pub fn nodes(&self, kind: NodeKind) -> &[TimelineNode] {
        match kind {
            NodeKind::Era => &self.eras,
            NodeKind::Event => &self.events,
            NodeKind::Scene => &self.scenes,
        }
    }

    pub fn node_count(&self) -> usize {
        self.eras.len() + self.events.len() + self.scenes.len()
    }

    /// Check the subtree is self-contained: every node's parent is in the
    /// snapshot, kinds match their collection and ids are unique
    pub fn validate(&self) -> Result<(), TimelineServiceError> {
        let mut parents: HashSet<&str> = HashSet::from([self.timeline.id.as_str()]);
        let mut seen: HashSet<&str> = HashSet::new();

        for kind in NodeKind::ALL {
            let mut level = HashSet::new();
            for node in self.nodes(kind) {
                if node.kind != kind {
                    return Err(TimelineServiceError::invalid_snapshot(format!(
                        "{} '{}' stored with the {}s",
                        node.kind, node.id, kind
                    )));
                }
                if !seen.insert(node.id.as_str()) {
                    return Err(TimelineServiceError::invalid_snapshot(format!(
                        "duplicate id '{}'",
                        node.id
                    )));
                }
                if !parents.contains(node.parent_id.as_str()) {
                    return Err(TimelineServiceError::invalid_snapshot(format!(
                        "{} '{}' references missing parent '{}'",
                        kind, node.id, node.parent_id
                    )));
                }
                level.insert(node.id.as_str());
            }
            parents = level;
        }
        Ok(())
    }
}

/// Outcome of comparing a local and a remote snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Local is newer (or remote is absent); push local
    KeepLocal,
    /// Remote is newer (or local is absent); apply remote
    TakeRemote,
    /// Same timestamp; nothing to do
    InSync,
}

/// Newest-timestamp-wins at whole-timeline granularity
pub fn resolve_newest(
    local: Option<&TimelineSnapshot>,
    remote: Option<&TimelineSnapshot>,
) -> SyncDecision {
    match (local, remote) {
        (None, None) => SyncDecision::InSync,
        (Some(_), None) => SyncDecision::KeepLocal,
        (None, Some(_)) => SyncDecision::TakeRemote,
        (Some(local), Some(remote)) => match local.updated_at.cmp(&remote.updated_at) {
            std::cmp::Ordering::Less => SyncDecision::TakeRemote,
            std::cmp::Ordering::Greater => SyncDecision::KeepLocal,
            std::cmp::Ordering::Equal => SyncDecision::InSync,
        },
    }
}

impl TimelineService {
    /// Export a timeline and its subtree
    pub async fn export_snapshot(
        &self,
        timeline_id: &str,
    ) -> Result<TimelineSnapshot, TimelineServiceError> {
        let timeline = self
            .store
            .get_timeline(timeline_id)
            .await?
            .ok_or_else(|| TimelineServiceError::timeline_not_found(timeline_id))?;

        let era_ids = self
            .store
            .list_by_parent(NodeKind::Era, timeline_id)
            .await?
            .into_iter()
            .map(|era| era.id)
            .collect();
        let levels = self.collect_levels(NodeKind::Era, era_ids).await?;
        let members: HashSet<String> = levels.into_iter().flat_map(|(_, ids)| ids).collect();

        let mut collections = Vec::with_capacity(NodeKind::ALL.len());
        for kind in NodeKind::ALL {
            let nodes: Vec<TimelineNode> = self
                .store
                .list_all(kind)
                .await?
                .into_iter()
                .filter(|node| members.contains(&node.id))
                .collect();
            collections.push(nodes);
        }
        let mut collections = collections.into_iter();

        Ok(TimelineSnapshot {
            updated_at: timeline.modified_at,
            timeline,
            eras: collections.next().unwrap_or_default(),
            events: collections.next().unwrap_or_default(),
            scenes: collections.next().unwrap_or_default(),
        })
    }

    /// Replace a timeline's whole subtree with a snapshot
    ///
    /// The snapshot is validated before anything is written. Node timestamps
    /// are kept as-is; the timeline's `modified_at` is set to the snapshot's
    /// `updated_at` so both sides agree afterwards.
    pub async fn apply_snapshot(
        &self,
        snapshot: TimelineSnapshot,
    ) -> Result<(), TimelineServiceError> {
        snapshot.validate()?;
        let timeline_id = snapshot.timeline.id.clone();

        let era_ids = self
            .store
            .list_by_parent(NodeKind::Era, &timeline_id)
            .await?
            .into_iter()
            .map(|era| era.id)
            .collect();
        let stale: HashSet<String> = self
            .collect_levels(NodeKind::Era, era_ids)
            .await?
            .into_iter()
            .flat_map(|(_, ids)| ids)
            .collect();

        let TimelineSnapshot {
            mut timeline,
            eras,
            events,
            scenes,
            updated_at,
        } = snapshot;
        timeline.modified_at = updated_at;
        self.store.upsert_timeline(timeline).await?;

        let incoming = [eras, events, scenes];
        let incoming_count: usize = incoming.iter().map(Vec::len).sum();

        for (kind, nodes) in NodeKind::ALL.into_iter().zip(incoming) {
            let incoming_ids: HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
            let mut collection: Vec<TimelineNode> = self
                .store
                .list_all(kind)
                .await?
                .into_iter()
                .filter(|node| !stale.contains(&node.id) && !incoming_ids.contains(&node.id))
                .collect();
            collection.extend(nodes);
            self.store.replace_all(kind, collection).await?;
        }

        tracing::info!(
            "Applied snapshot for timeline '{}' ({} nodes replaced by {})",
            timeline_id,
            stale.len(),
            incoming_count
        );
        self.emit_event(DomainEvent::TimelineReplaced { timeline_id });
        Ok(())
    }

    /// Reconcile with a remote copy; applies it when it is newer
    ///
    /// Returns the decision so the caller knows whether to push local state.
    pub async fn sync_with(
        &self,
        remote: TimelineSnapshot,
    ) -> Result<SyncDecision, TimelineServiceError> {
        let local = match self.export_snapshot(&remote.timeline.id).await {
            Ok(local) => Some(local),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let decision = resolve_newest(local.as_ref(), Some(&remote));
        tracing::debug!(
            "Sync decision for timeline '{}': {:?}",
            remote.timeline.id,
            decision
        );
        if decision == SyncDecision::TakeRemote {
            self.apply_snapshot(remote).await?;
        }
        Ok(decision)
    }
}
