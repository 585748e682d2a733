//! Rendered timeline tree
//!
//! Read model produced by `TimelineService::timeline_tree`: every level is
//! already in rendered order.

use crate::models::{Timeline, TimelineNode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineTree {
    pub timeline: Timeline,
    pub eras: Vec<EraBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EraBranch {
    pub era: TimelineNode,
    pub events: Vec<EventBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBranch {
    pub event: TimelineNode,
    pub scenes: Vec<TimelineNode>,
}

impl TimelineTree {
    /// Total number of eras, events and scenes
    pub fn node_count(&self) -> usize {
        self.eras
            .iter()
            .map(|era| {
                1 + era
                    .events
                    .iter()
                    .map(|event| 1 + event.scenes.len())
                    .sum::<usize>()
            })
            .sum()
    }
}
