//! JSON file NodeStore
//!
//! Persists the whole store as one JSON document on local disk. Every write
//! updates the in-memory working set and then rewrites the file, mirroring a
//! device-storage collaborator that only knows "save everything".
//!
//! Writes go to a sibling `*.tmp` file which is then renamed over the target,
//! so a crash mid-write leaves the previous document intact.

use crate::db::{MemoryStore, NodeStore, StoreDocument, StoreError};
use crate::models::{NodeKind, Timeline, TimelineNode};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// NodeStore persisted to a single JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    /// Serializes mutate-then-flush so file contents follow write order
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (or create) the store at `path`
    ///
    /// A missing file yields an empty store; the file is created on first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => StoreDocument::default(),
            Ok(contents) => {
                let document: StoreDocument = serde_json::from_str(&contents)?;
                document.validate()?;
                document
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No store file at {:?}; starting empty", path);
                StoreDocument::default()
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        tracing::info!(
            "Opened timeline store at {:?} ({} timelines, {} eras, {} events, {} scenes)",
            path,
            document.timelines.len(),
            document.eras.len(),
            document.events.len(),
            document.scenes.len()
        );

        Ok(Self {
            path,
            inner: MemoryStore::with_document(document),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let document = self.inner.document().await;
        let contents = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, contents)
            .await
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

#[async_trait]
impl NodeStore for JsonFileStore {
    async fn list_by_parent(
        &self,
        kind: NodeKind,
        parent_id: &str,
    ) -> Result<Vec<TimelineNode>, StoreError> {
        self.inner.list_by_parent(kind, parent_id).await
    }

    async fn list_all(&self, kind: NodeKind) -> Result<Vec<TimelineNode>, StoreError> {
        self.inner.list_all(kind).await
    }

    async fn get_by_id(
        &self,
        kind: NodeKind,
        id: &str,
    ) -> Result<Option<TimelineNode>, StoreError> {
        self.inner.get_by_id(kind, id).await
    }

    async fn insert(&self, node: TimelineNode) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.inner.insert(node).await?;
        self.flush().await
    }

    async fn replace_all(
        &self,
        kind: NodeKind,
        nodes: Vec<TimelineNode>,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.inner.replace_all(kind, nodes).await?;
        self.flush().await
    }

    async fn remove_by_id(&self, kind: NodeKind, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let existed = self.inner.remove_by_id(kind, id).await?;
        if existed {
            self.flush().await?;
        }
        Ok(existed)
    }

    async fn list_timelines(&self) -> Result<Vec<Timeline>, StoreError> {
        self.inner.list_timelines().await
    }

    async fn get_timeline(&self, id: &str) -> Result<Option<Timeline>, StoreError> {
        self.inner.get_timeline(id).await
    }

    async fn upsert_timeline(&self, timeline: Timeline) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.inner.upsert_timeline(timeline).await?;
        self.flush().await
    }

    async fn remove_timeline(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let existed = self.inner.remove_timeline(id).await?;
        if existed {
            self.flush().await?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp_dir.path().join("missing.json"))
            .await
            .unwrap();
        assert!(store.list_timelines().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("timeline.json");

        let timeline = Timeline::new("History", false);
        let era = TimelineNode::new(NodeKind::Era, &timeline.id, "Antiquity");
        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.upsert_timeline(timeline.clone()).await.unwrap();
            store.insert(era.clone()).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get_timeline(&timeline.id).await.unwrap(),
            Some(timeline.clone())
        );
        assert_eq!(
            reopened.list_by_parent(NodeKind::Era, &timeline.id).await.unwrap(),
            vec![era]
        );
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
