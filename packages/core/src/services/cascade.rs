//! Cascade deletion and orphan sweeping
//!
//! Deleting a node removes its whole subtree. Descendants are collected level
//! by level and removed deepest level first, so an interrupted delete can only
//! leave a partial subtree still attached to its root, never records pointing
//! at a removed parent. Anything that does end up dangling (crash, concurrent
//! writer, hand-edited store) is collected by [`TimelineService::sweep_orphans`].

use crate::db::DomainEvent;
use crate::models::{DeleteResult, NodeKind, TimelineNode};
use crate::services::{TimelineService, TimelineServiceError};
use std::collections::HashSet;

/// One level of a subtree: the kind and the ids to remove
pub(super) type Level = (NodeKind, Vec<String>);

impl TimelineService {
    /// Delete a node and every descendant
    ///
    /// Deleting a node that doesn't exist is not an error; the result reports
    /// `existed: false` and nothing is written.
    pub async fn delete_subtree(
        &self,
        kind: NodeKind,
        id: &str,
    ) -> Result<DeleteResult, TimelineServiceError> {
        let Some(node) = self.store.get_by_id(kind, id).await? else {
            tracing::debug!("Delete of missing {} '{}' ignored", kind, id);
            return Ok(DeleteResult::default());
        };

        let timeline_id = self
            .timeline_for_parent(kind, &node.id, &node.parent_id)
            .await
            .map_err(|e| tracing::warn!("Deleting node outside a reachable timeline: {}", e))
            .ok();

        let levels = self.collect_levels(kind, vec![id.to_string()]).await?;
        let deleted_count = self.remove_levels(levels).await?;

        if let Some(timeline_id) = timeline_id {
            self.touch_timeline(&timeline_id).await?;
        }

        tracing::info!(
            "Deleted {} '{}' and {} descendants",
            kind,
            id,
            deleted_count.saturating_sub(1)
        );
        self.emit_event(DomainEvent::SubtreeDeleted {
            kind: Some(kind),
            id: id.to_string(),
            deleted_count,
        });

        Ok(DeleteResult {
            existed: true,
            deleted_count,
        })
    }

    /// Delete a timeline with all its eras, events and scenes
    ///
    /// The count includes the timeline record itself.
    pub async fn delete_timeline(&self, id: &str) -> Result<DeleteResult, TimelineServiceError> {
        if self.store.get_timeline(id).await?.is_none() {
            tracing::debug!("Delete of missing timeline '{}' ignored", id);
            return Ok(DeleteResult::default());
        }

        let era_ids = self
            .store
            .list_by_parent(NodeKind::Era, id)
            .await?
            .into_iter()
            .map(|era| era.id)
            .collect();
        let levels = self.collect_levels(NodeKind::Era, era_ids).await?;
        let mut deleted_count = self.remove_levels(levels).await?;

        if self.store.remove_timeline(id).await? {
            deleted_count += 1;
        }

        tracing::info!("Deleted timeline '{}' ({} records)", id, deleted_count);
        self.emit_event(DomainEvent::SubtreeDeleted {
            kind: None,
            id: id.to_string(),
            deleted_count,
        });

        Ok(DeleteResult {
            existed: true,
            deleted_count,
        })
    }

    /// Remove every node whose parent no longer exists
    ///
    /// Runs top-down (eras, then events, then scenes) so removing an orphaned
    /// era orphans its events within the same sweep. A second sweep right
    /// after always returns 0. Returns the number of nodes removed.
    pub async fn sweep_orphans(&self) -> Result<usize, TimelineServiceError> {
        let mut live_parents: HashSet<String> = self
            .store
            .list_timelines()
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let mut removed = 0;
        for kind in NodeKind::ALL {
            let collection = self.store.list_all(kind).await?;
            let total = collection.len();
            let (kept, orphans): (Vec<TimelineNode>, Vec<TimelineNode>) = collection
                .into_iter()
                .partition(|node| live_parents.contains(&node.parent_id));

            for orphan in &orphans {
                tracing::warn!(
                    "Removing orphaned {} '{}' (missing parent '{}')",
                    kind,
                    orphan.id,
                    orphan.parent_id
                );
            }

            live_parents = kept.iter().map(|node| node.id.clone()).collect();
            if kept.len() != total {
                removed += orphans.len();
                self.store.replace_all(kind, kept).await?;
            }
        }

        if removed > 0 {
            tracing::info!("Swept {} orphaned nodes", removed);
        }
        Ok(removed)
    }

    /// Breadth-first collection of a subtree, one entry per level
    pub(super) async fn collect_levels(
        &self,
        kind: NodeKind,
        ids: Vec<String>,
    ) -> Result<Vec<Level>, TimelineServiceError> {
        let mut levels = Vec::new();
        let mut current: Level = (kind, ids);

        while !current.1.is_empty() {
            let next = match current.0.child_kind() {
                Some(child_kind) => {
                    let mut child_ids = Vec::new();
                    for parent_id in &current.1 {
                        child_ids.extend(
                            self.store
                                .list_by_parent(child_kind, parent_id)
                                .await?
                                .into_iter()
                                .map(|child| child.id),
                        );
                    }
                    Some((child_kind, child_ids))
                }
                None => None,
            };
            levels.push(current);
            match next {
                Some(next) => current = next,
                None => break,
            }
        }

        Ok(levels)
    }

    /// Remove collected levels, deepest first; returns how many were removed
    async fn remove_levels(&self, levels: Vec<Level>) -> Result<usize, TimelineServiceError> {
        let mut deleted = 0;
        for (kind, ids) in levels.into_iter().rev() {
            for id in ids {
                if self.store.remove_by_id(kind, &id).await? {
                    deleted += 1;
                } else {
                    tracing::warn!("{} '{}' vanished during cascade delete", kind, id);
                }
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{DomainEvent, MemoryStore, NodeStore};
    use crate::models::{NewNode, NodeKind, TimelineNode};
    use crate::services::TimelineService;
    use std::sync::Arc;

    struct Fixture {
        service: TimelineService,
        store: Arc<MemoryStore>,
        timeline_id: String,
        era_id: String,
        event_ids: Vec<String>,
    }

    /// Timeline with one era, two events and three scenes under the first event
    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let service = TimelineService::new(store.clone());
        let timeline = service.create_timeline("T", false).await.unwrap();
        let era = service
            .create_node(NodeKind::Era, NewNode::under(&timeline.id, "E1"))
            .await
            .unwrap();

        let mut event_ids = Vec::new();
        for title in ["V1", "V2"] {
            let event = service
                .create_node(NodeKind::Event, NewNode::under(&era.id, title))
                .await
                .unwrap();
            event_ids.push(event.id);
        }
        for title in ["S1", "S2", "S3"] {
            service
                .create_node(NodeKind::Scene, NewNode::under(&event_ids[0], title))
                .await
                .unwrap();
        }

        Fixture {
            service,
            store,
            timeline_id: timeline.id,
            era_id: era.id,
            event_ids,
        }
    }

    #[tokio::test]
    async fn test_delete_era_removes_descendants() {
        let f = fixture().await;
        let mut events = f.service.subscribe_to_events();

        let result = f.service.delete_subtree(NodeKind::Era, &f.era_id).await.unwrap();
        assert!(result.existed);
        assert_eq!(result.deleted_count, 6);

        for kind in NodeKind::ALL {
            assert!(f.store.list_all(kind).await.unwrap().is_empty());
        }
        assert!(f.store.get_timeline(&f.timeline_id).await.unwrap().is_some());

        match events.try_recv().unwrap() {
            DomainEvent::SubtreeDeleted { kind, deleted_count, .. } => {
                assert_eq!(kind, Some(NodeKind::Era));
                assert_eq!(deleted_count, 6);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_event_leaves_siblings() {
        let f = fixture().await;
        let result = f
            .service
            .delete_subtree(NodeKind::Event, &f.event_ids[0])
            .await
            .unwrap();
        assert_eq!(result.deleted_count, 4);

        let remaining = f.store.list_all(NodeKind::Event).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, f.event_ids[1]);
        assert!(f.store.list_all(NodeKind::Scene).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let f = fixture().await;
        let result = f.service.delete_subtree(NodeKind::Scene, "nope").await.unwrap();
        assert!(!result.existed);
        assert_eq!(result.deleted_count, 0);
        assert_eq!(f.store.list_all(NodeKind::Scene).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_timeline_cascades() {
        let f = fixture().await;
        let result = f.service.delete_timeline(&f.timeline_id).await.unwrap();
        assert_eq!(result.deleted_count, 7);
        assert!(f.store.list_timelines().await.unwrap().is_empty());
        assert!(f.store.list_all(NodeKind::Era).await.unwrap().is_empty());

        let again = f.service.delete_timeline(&f.timeline_id).await.unwrap();
        assert!(!again.existed);
    }

    #[tokio::test]
    async fn test_sweep_orphans_reaches_fixed_point() {
        let f = fixture().await;

        // Orphan chain: an event under a missing era, with a scene below it
        let stray_event = TimelineNode::new(NodeKind::Event, "ghost-era", "Stray");
        let stray_scene = TimelineNode::new(NodeKind::Scene, stray_event.id.clone(), "Stray scene");
        f.store.insert(stray_event).await.unwrap();
        f.store.insert(stray_scene).await.unwrap();

        // Era whose timeline record was removed out from under it
        let dangling_era = TimelineNode::new(NodeKind::Era, "ghost-timeline", "Dangling");
        f.store.insert(dangling_era).await.unwrap();

        assert_eq!(f.service.sweep_orphans().await.unwrap(), 3);
        assert_eq!(f.service.sweep_orphans().await.unwrap(), 0);

        assert_eq!(f.store.list_all(NodeKind::Era).await.unwrap().len(), 1);
        assert_eq!(f.store.list_all(NodeKind::Event).await.unwrap().len(), 2);
        assert_eq!(f.store.list_all(NodeKind::Scene).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_sweep_after_timeline_record_removed() {
        let f = fixture().await;
        f.store.remove_timeline(&f.timeline_id).await.unwrap();

        assert_eq!(f.service.sweep_orphans().await.unwrap(), 6);
        for kind in NodeKind::ALL {
            assert!(f.store.list_all(kind).await.unwrap().is_empty());
        }
    }
}
