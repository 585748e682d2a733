//! In-memory NodeStore
//!
//! Keeps every collection in insertion order behind a tokio `RwLock`. Used
//! directly by tests and as the working set of [`crate::db::JsonFileStore`].

use crate::db::{NodeStore, StoreError};
use crate::models::{NodeKind, Timeline, TimelineNode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Current on-disk document layout version
pub const STORE_DOCUMENT_VERSION: u32 = 1;

fn default_document_version() -> u32 {
    STORE_DOCUMENT_VERSION
}

/// Serializable contents of a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    #[serde(default = "default_document_version")]
    pub version: u32,
    #[serde(default)]
    pub timelines: Vec<Timeline>,
    #[serde(default)]
    pub eras: Vec<TimelineNode>,
    #[serde(default)]
    pub events: Vec<TimelineNode>,
    #[serde(default)]
    pub scenes: Vec<TimelineNode>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: STORE_DOCUMENT_VERSION,
            timelines: Vec::new(),
            eras: Vec::new(),
            events: Vec::new(),
            scenes: Vec::new(),
        }
    }
}

impl StoreDocument {
    pub fn collection(&self, kind: NodeKind) -> &Vec<TimelineNode> {
        match kind {
            NodeKind::Era => &self.eras,
            NodeKind::Event => &self.events,
            NodeKind::Scene => &self.scenes,
        }
    }

    pub fn collection_mut(&mut self, kind: NodeKind) -> &mut Vec<TimelineNode> {
        match kind {
            NodeKind::Era => &mut self.eras,
            NodeKind::Event => &mut self.events,
            NodeKind::Scene => &mut self.scenes,
        }
    }

    /// Check that every node sits in the collection matching its kind
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.version > STORE_DOCUMENT_VERSION {
            return Err(StoreError::corrupt(format!(
                "document version {} is newer than supported version {}",
                self.version, STORE_DOCUMENT_VERSION
            )));
        }
        for kind in NodeKind::ALL {
            if let Some(node) = self.collection(kind).iter().find(|n| n.kind != kind) {
                return Err(StoreError::corrupt(format!(
                    "{} '{}' stored in the {} collection",
                    node.kind, node.id, kind
                )));
            }
        }
        Ok(())
    }
}

/// NodeStore backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: RwLock<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a document
    pub fn with_document(document: StoreDocument) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }

    /// Copy of the current contents
    pub async fn document(&self) -> StoreDocument {
        self.document.read().await.clone()
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn list_by_parent(
        &self,
        kind: NodeKind,
        parent_id: &str,
    ) -> Result<Vec<TimelineNode>, StoreError> {
        let document = self.document.read().await;
        Ok(document
            .collection(kind)
            .iter()
            .filter(|node| node.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self, kind: NodeKind) -> Result<Vec<TimelineNode>, StoreError> {
        Ok(self.document.read().await.collection(kind).clone())
    }

    async fn get_by_id(
        &self,
        kind: NodeKind,
        id: &str,
    ) -> Result<Option<TimelineNode>, StoreError> {
        let document = self.document.read().await;
        Ok(document.collection(kind).iter().find(|n| n.id == id).cloned())
    }

    async fn insert(&self, node: TimelineNode) -> Result<(), StoreError> {
        let mut document = self.document.write().await;
        let collection = document.collection_mut(node.kind);
        if collection.iter().any(|n| n.id == node.id) {
            return Err(StoreError::duplicate_node(node.kind, node.id));
        }
        collection.push(node);
        Ok(())
    }

    async fn replace_all(
        &self,
        kind: NodeKind,
        nodes: Vec<TimelineNode>,
    ) -> Result<(), StoreError> {
        if let Some(node) = nodes.iter().find(|n| n.kind != kind) {
            return Err(StoreError::corrupt(format!(
                "cannot store {} '{}' in the {} collection",
                node.kind, node.id, kind
            )));
        }
        *self.document.write().await.collection_mut(kind) = nodes;
        Ok(())
    }

    async fn remove_by_id(&self, kind: NodeKind, id: &str) -> Result<bool, StoreError> {
        let mut document = self.document.write().await;
        let collection = document.collection_mut(kind);
        let before = collection.len();
        collection.retain(|n| n.id != id);
        Ok(collection.len() != before)
    }

    async fn list_timelines(&self) -> Result<Vec<Timeline>, StoreError> {
        Ok(self.document.read().await.timelines.clone())
    }

    async fn get_timeline(&self, id: &str) -> Result<Option<Timeline>, StoreError> {
        let document = self.document.read().await;
        Ok(document.timelines.iter().find(|t| t.id == id).cloned())
    }

    async fn upsert_timeline(&self, timeline: Timeline) -> Result<(), StoreError> {
        let mut document = self.document.write().await;
        match document.timelines.iter_mut().find(|t| t.id == timeline.id) {
            Some(existing) => *existing = timeline,
            None => document.timelines.push(timeline),
        }
        Ok(())
    }

    async fn remove_timeline(&self, id: &str) -> Result<bool, StoreError> {
        let mut document = self.document.write().await;
        let before = document.timelines.len();
        document.timelines.retain(|t| t.id != id);
        Ok(document.timelines.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(parent: &str, title: &str) -> TimelineNode {
        TimelineNode::new(NodeKind::Event, parent, title)
    }

    #[tokio::test]
    async fn test_list_by_parent_keeps_insertion_order() {
        let store = MemoryStore::new();
        store.insert(event("era-1", "a")).await.unwrap();
        store.insert(event("era-2", "x")).await.unwrap();
        store.insert(event("era-1", "b")).await.unwrap();

        let children = store.list_by_parent(NodeKind::Event, "era-1").await.unwrap();
        let titles: Vec<_> = children.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["a", "b"]);
    }

    #[tokio::test]
    async fn test_collections_are_partitioned_by_kind() {
        let store = MemoryStore::new();
        let scene = TimelineNode::new(NodeKind::Scene, "event-1", "scene");
        store.insert(scene.clone()).await.unwrap();

        assert!(store.get_by_id(NodeKind::Event, &scene.id).await.unwrap().is_none());
        assert!(store.get_by_id(NodeKind::Scene, &scene.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryStore::new();
        let node = event("era-1", "a");
        store.insert(node.clone()).await.unwrap();

        let err = store.insert(node).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
    }

    #[tokio::test]
    async fn test_replace_all_and_remove() {
        let store = MemoryStore::new();
        let a = event("era-1", "a");
        let b = event("era-1", "b");
        store.insert(a.clone()).await.unwrap();

        store
            .replace_all(NodeKind::Event, vec![b.clone(), a.clone()])
            .await
            .unwrap();
        let all = store.list_all(NodeKind::Event).await.unwrap();
        assert_eq!(all, vec![b.clone(), a.clone()]);

        assert!(store.remove_by_id(NodeKind::Event, &a.id).await.unwrap());
        assert!(!store.remove_by_id(NodeKind::Event, &a.id).await.unwrap());
        assert_eq!(store.list_all(NodeKind::Event).await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn test_replace_all_rejects_foreign_kind() {
        let store = MemoryStore::new();
        let scene = TimelineNode::new(NodeKind::Scene, "event-1", "scene");
        assert!(store.replace_all(NodeKind::Event, vec![scene]).await.is_err());
    }

    #[tokio::test]
    async fn test_upsert_timeline() {
        let store = MemoryStore::new();
        let mut timeline = Timeline::new("History", false);
        store.upsert_timeline(timeline.clone()).await.unwrap();

        timeline.title = "World History".to_string();
        store.upsert_timeline(timeline.clone()).await.unwrap();

        let timelines = store.list_timelines().await.unwrap();
        assert_eq!(timelines.len(), 1);
        assert_eq!(timelines[0].title, "World History");
        assert!(store.remove_timeline(&timeline.id).await.unwrap());
        assert!(store.get_timeline(&timeline.id).await.unwrap().is_none());
    }

    #[test]
    fn test_document_validate_detects_misplaced_node() {
        let document = StoreDocument {
            events: vec![TimelineNode::new(NodeKind::Scene, "e", "misplaced")],
            ..Default::default()
        };
        assert!(document.validate().is_err());
        assert!(StoreDocument::default().validate().is_ok());
    }
}
