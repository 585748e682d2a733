//! Service Layer Error Types
//!
//! This module defines the error taxonomy surfaced to callers of
//! [`crate::services::TimelineService`]. Ordering never fails; these errors only
//! come from coordinator operations and from the storage collaborator.

use crate::config::ConfigError;
use crate::db::StoreError;
use crate::models::NodeKind;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum TimelineServiceError {
    /// The addressed node does not exist in its collection
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// A time value was required to be an absolute date and is not
    #[error("Invalid time value: {value:?} is not an absolute date")]
    InvalidTimeValue { value: String },

    /// A reference points at a record that does not exist
    #[error("{kind} '{id}' references missing {missing}")]
    OrphanReference {
        kind: String,
        id: String,
        missing: String,
    },

    /// The requested parent does not exist or is of the wrong kind
    #[error("Invalid parent for {kind}: {parent_id}")]
    InvalidParent { kind: String, parent_id: String },

    /// The storage collaborator failed; propagated unchanged
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    /// CSV import/export failed
    #[error("CSV error: {0}")]
    Csv(String),

    /// Snapshot could not be applied
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Configuration failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TimelineServiceError {
    /// Create a not found error for a node
    pub fn node_not_found(kind: NodeKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            id: id.into(),
        }
    }

    /// Create a not found error for a timeline
    pub fn timeline_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "timeline".to_string(),
            id: id.into(),
        }
    }

    /// Create an invalid time value error
    pub fn invalid_time(value: impl Into<String>) -> Self {
        Self::InvalidTimeValue {
            value: value.into(),
        }
    }

    /// Create an orphan reference error
    pub fn orphan_reference(
        kind: NodeKind,
        id: impl Into<String>,
        missing: impl Into<String>,
    ) -> Self {
        Self::OrphanReference {
            kind: kind.to_string(),
            id: id.into(),
            missing: missing.into(),
        }
    }

    /// Create an invalid parent error
    pub fn invalid_parent(kind: NodeKind, parent_id: impl Into<String>) -> Self {
        Self::InvalidParent {
            kind: kind.to_string(),
            parent_id: parent_id.into(),
        }
    }

    /// Create a CSV error
    pub fn csv(msg: impl Into<String>) -> Self {
        Self::Csv(msg.into())
    }

    /// Create an invalid snapshot error
    pub fn invalid_snapshot(msg: impl Into<String>) -> Self {
        Self::InvalidSnapshot(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<csv::Error> for TimelineServiceError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}
