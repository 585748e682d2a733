//! Data Models
//!
//! This module contains the record shapes used throughout the timeline:
//!
//! - `Timeline` - root record owning eras
//! - `TimelineNode` - shared shape of eras, events and scenes
//! - `time` - time value classification and comparison
//! - `TimelineTree` - a whole timeline in rendered order
//!
//! Models are plain data. Ordering lives in [`crate::ordering`], persistence in
//! [`crate::db`].

mod node;
pub mod time;
mod tree;

pub use node::{
    DeleteResult, NewNode, NodeKind, NodeUpdate, PositionType, Timeline, TimelineNode,
};
pub use time::{compare_times, TimeValue};
pub use tree::{EraBranch, EventBranch, TimelineTree};
