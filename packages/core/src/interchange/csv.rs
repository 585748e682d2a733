//! Flat CSV rows for timeline import and export
//!
//! One row per timeline, era, event or scene with the columns
//! `type, id, parentId, parentType, title, description, time, startTime,
//! endTime, imageUrl, order, isFictional, positionRelativeTo, positionType`.
//!
//! Export walks the timeline in rendered order. Import accepts rows in any
//! order: every record gets a fresh id, parents are created before children,
//! and relative anchors are rewritten through the old → new id table once all
//! records exist.

use crate::models::{NewNode, NodeKind, NodeUpdate, PositionType, Timeline, TimelineNode};
use crate::services::{TimelineService, TimelineServiceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;

const TIMELINE_TYPE: &str = "timeline";

/// A single CSV record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvRow {
    #[serde(rename = "type")]
    pub record_type: String,
    pub id: String,
    pub parent_id: Option<String>,
    pub parent_type: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub image_url: Option<String>,
    pub order: Option<i64>,
    pub is_fictional: Option<bool>,
    pub position_relative_to: Option<String>,
    pub position_type: Option<String>,
}

impl CsvRow {
    fn from_timeline(timeline: &Timeline) -> Self {
        Self {
            record_type: TIMELINE_TYPE.to_string(),
            id: timeline.id.clone(),
            title: timeline.title.clone(),
            description: non_empty(&timeline.description),
            is_fictional: Some(timeline.is_fictional),
            ..Default::default()
        }
    }

    fn from_node(node: &TimelineNode) -> Self {
        let parent_type = node
            .kind
            .parent_kind()
            .map_or(TIMELINE_TYPE, NodeKind::as_str);
        Self {
            record_type: node.kind.as_str().to_string(),
            id: node.id.clone(),
            parent_id: Some(node.parent_id.clone()),
            parent_type: Some(parent_type.to_string()),
            title: node.title.clone(),
            description: non_empty(&node.description),
            time: node.time.clone(),
            start_time: node.start_time.clone(),
            end_time: node.end_time.clone(),
            image_url: node.image_url.clone(),
            order: Some(node.order),
            is_fictional: None,
            position_relative_to: node.position_relative_to.clone(),
            position_type: node.position_type.map(|p| p.as_str().to_string()),
        }
    }

    fn new_node(&self, parent_id: String) -> NewNode {
        NewNode {
            parent_id,
            title: self.title.clone(),
            description: self.description.clone().unwrap_or_default(),
            time: self.time.clone(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            order: self.order,
            position_relative_to: None,
            position_type: None,
            image_url: self.image_url.clone(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Counts reported by [`import_csv`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Fresh ids of the timelines created
    pub timeline_ids: Vec<String>,
    pub eras: usize,
    pub events: usize,
    pub scenes: usize,
    /// Rows skipped: unknown type, or parent neither imported nor stored
    pub skipped_rows: usize,
    /// Relative anchors dropped because the anchor was not imported
    pub dropped_anchors: usize,
}

impl ImportReport {
    pub fn node_count(&self) -> usize {
        self.eras + self.events + self.scenes
    }

    fn record(&mut self, kind: NodeKind) {
        match kind {
            NodeKind::Era => self.eras += 1,
            NodeKind::Event => self.events += 1,
            NodeKind::Scene => self.scenes += 1,
        }
    }
}

/// Write a timeline and its subtree as CSV; returns the number of rows written
pub async fn export_timeline<W: io::Write>(
    service: &TimelineService,
    timeline_id: &str,
    writer: W,
    delimiter: u8,
) -> Result<usize, TimelineServiceError> {
    let tree = service.timeline_tree(timeline_id).await?;

    let mut rows = vec![CsvRow::from_timeline(&tree.timeline)];
    for era in &tree.eras {
        rows.push(CsvRow::from_node(&era.era));
        for event in &era.events {
            rows.push(CsvRow::from_node(&event.event));
            rows.extend(event.scenes.iter().map(CsvRow::from_node));
        }
    }

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()
        .map_err(|e| TimelineServiceError::csv(format!("flush failed: {e}")))?;

    tracing::info!("Exported timeline '{}' ({} rows)", timeline_id, rows.len());
    Ok(rows.len())
}

/// Import timelines, eras, events and scenes from CSV
///
/// Rows whose parent is neither in the file nor already stored are skipped
/// with a warning, as are anchors that can't be remapped.
pub async fn import_csv<R: io::Read>(
    service: &TimelineService,
    reader: R,
    delimiter: u8,
) -> Result<ImportReport, TimelineServiceError> {
    let mut timelines = Vec::new();
    let mut by_kind: HashMap<NodeKind, Vec<CsvRow>> = HashMap::new();
    let mut report = ImportReport::default();

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::Fields)
        .from_reader(reader);
    for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        if row.record_type.eq_ignore_ascii_case(TIMELINE_TYPE) {
            timelines.push(row);
            continue;
        }
        match row.record_type.parse::<NodeKind>() {
            Ok(kind) => by_kind.entry(kind).or_default().push(row),
            Err(e) => {
                tracing::warn!("Skipping CSV record {}: {}", line + 1, e);
                report.skipped_rows += 1;
            }
        }
    }
    drop(rdr);

    let mut timeline_ids: HashMap<String, String> = HashMap::new();
    for row in timelines {
        let mut timeline = service
            .create_timeline(row.title, row.is_fictional.unwrap_or(false))
            .await?;
        if let Some(description) = row.description {
            timeline.description = description;
            service.store().upsert_timeline(timeline.clone()).await?;
        }
        if !row.id.is_empty() {
            timeline_ids.insert(row.id, timeline.id.clone());
        }
        report.timeline_ids.push(timeline.id);
    }

    let mut node_ids: HashMap<NodeKind, HashMap<String, String>> = HashMap::new();
    let mut anchored: Vec<(NodeKind, String, String, PositionType)> = Vec::new();

    for kind in NodeKind::ALL {
        let rows = by_kind.remove(&kind).unwrap_or_default();
        let mut remapped = HashMap::new();

        for row in rows {
            let Some(parent_id) =
                resolve_parent(service, kind, &row, &timeline_ids, &node_ids).await?
            else {
                tracing::warn!(
                    "Skipping {} '{}': parent '{}' not found",
                    kind,
                    row.id,
                    row.parent_id.as_deref().unwrap_or_default()
                );
                report.skipped_rows += 1;
                continue;
            };

            let node = service.create_node(kind, row.new_node(parent_id)).await?;
            report.record(kind);

            if let Some(anchor) = row.position_relative_to.filter(|a| !a.is_empty()) {
                let side = row
                    .position_type
                    .as_deref()
                    .map_or(PositionType::After, PositionType::parse);
                anchored.push((kind, node.id.clone(), anchor, side));
            }
            if !row.id.is_empty() && remapped.insert(row.id.clone(), node.id).is_some() {
                tracing::warn!("Duplicate {} id '{}' in CSV; keeping the last", kind, row.id);
            }
        }
        node_ids.insert(kind, remapped);
    }

    for (kind, id, anchor, side) in anchored {
        match node_ids.get(&kind).and_then(|ids| ids.get(&anchor)) {
            Some(new_anchor) => {
                let patch = NodeUpdate::new().with_relative_position(Some((new_anchor.clone(), side)));
                service.update_fields(kind, &id, patch).await?;
            }
            None => {
                tracing::warn!(
                    "Dropping relative position of {} '{}': anchor '{}' not imported",
                    kind,
                    id,
                    anchor
                );
                report.dropped_anchors += 1;
            }
        }
    }

    tracing::info!(
        "Imported {} timelines and {} nodes ({} rows skipped)",
        report.timeline_ids.len(),
        report.node_count(),
        report.skipped_rows
    );
    Ok(report)
}

/// New parent id for a row: an imported parent, else an already stored one
async fn resolve_parent(
    service: &TimelineService,
    kind: NodeKind,
    row: &CsvRow,
    timeline_ids: &HashMap<String, String>,
    node_ids: &HashMap<NodeKind, HashMap<String, String>>,
) -> Result<Option<String>, TimelineServiceError> {
    let Some(parent_id) = row.parent_id.as_deref().filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    match kind.parent_kind() {
        None => {
            if let Some(new_id) = timeline_ids.get(parent_id) {
                return Ok(Some(new_id.clone()));
            }
            let stored = service.get_timeline(parent_id).await?;
            Ok(stored.map(|t| t.id))
        }
        Some(parent_kind) => {
            if let Some(new_id) = node_ids.get(&parent_kind).and_then(|ids| ids.get(parent_id)) {
                return Ok(Some(new_id.clone()));
            }
            let stored = service.get_node(parent_kind, parent_id).await?;
            Ok(stored.map(|n| n.id))
        }
    }
}
