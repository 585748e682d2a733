//! Store Error Types
//!
//! This module defines error types for the storage collaborator. The service
//! layer wraps these unchanged, so callers can still tell an I/O failure from
//! a corrupt document.

use crate::models::NodeKind;
use std::path::PathBuf;
use thiserror::Error;

/// Storage operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("Store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The backing document could not be (de)serialized
    #[error("Store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record with this id already exists in the collection
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: String, id: String },

    /// The backing document is readable but structurally invalid
    #[error("Corrupt store document: {0}")]
    CorruptDocument(String),
}

impl StoreError {
    /// Create an I/O error with the path that failed
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a duplicate id error for a node collection
    pub fn duplicate_node(kind: NodeKind, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            kind: kind.to_string(),
            id: id.into(),
        }
    }

    /// Create a corrupt document error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptDocument(msg.into())
    }
}
