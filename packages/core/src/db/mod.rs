//! Storage Layer
//!
//! This module is the storage collaborator seen by the rest of the crate:
//!
//! - [`NodeStore`] - async trait with list/get/insert/replace/remove primitives
//! - [`MemoryStore`] - insertion-ordered in-memory collections
//! - [`JsonFileStore`] - the same collections persisted as one JSON document
//! - [`DomainEvent`] - change notifications emitted after persisted writes
//!
//! Stores hold no ordering or validation logic. Sibling ordering lives in
//! [`crate::ordering`], integrity rules in [`crate::services`].

mod error;
pub mod events;
mod json_file_store;
mod memory_store;
mod node_store;

pub use error::StoreError;
pub use events::{DomainEvent, ReorderedNode};
pub use json_file_store::JsonFileStore;
pub use memory_store::{MemoryStore, StoreDocument, STORE_DOCUMENT_VERSION};
pub use node_store::NodeStore;
