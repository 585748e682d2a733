//! Timeline Core
//!
//! This crate orders and maintains hierarchical timelines: a timeline owns
//! eras, eras own events, events own scenes. Siblings at every level are
//! rendered in one deterministic sequence reconciled from absolute or
//! fictional times, explicit integer orders, and "before/after that sibling"
//! relative positions.
//!
//! # Architecture
//!
//! - **Pure ordering**: [`ordering::order_siblings`] is a total function over a
//!   sibling set; it never fails and never touches storage
//! - **Flat storage**: eras, events and scenes live in three type-partitioned
//!   collections behind the [`db::NodeStore`] trait
//! - **Single coordinator**: [`services::TimelineService`] owns every write
//!   (create, update, reorder, cascade delete, snapshot apply) and broadcasts
//!   [`db::DomainEvent`]s afterwards
//!
//! # Modules
//!
//! - [`models`] - Record shapes and the time model
//! - [`ordering`] - The sibling ordering engine
//! - [`db`] - Storage trait, in-memory and JSON file stores, domain events
//! - [`services`] - Mutation/reorder coordination, cascade deletion, snapshots
//! - [`interchange`] - CSV import and export
//! - [`config`] - Runtime configuration

pub mod config;
pub mod db;
pub mod interchange;
pub mod models;
pub mod ordering;
pub mod services;

// Re-export commonly used types
pub use config::TimelineConfig;
pub use models::*;
pub use services::*;
