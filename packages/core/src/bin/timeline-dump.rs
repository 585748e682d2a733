//! Timeline Dump Binary
//!
//! Development helper that opens the JSON store and prints every timeline in
//! rendered order. Useful for checking what the ordering engine makes of a
//! data file without a UI attached.
//!
//! # Usage
//!
//! ```bash
//! # Dump the default store (~/.timeline/data/timeline.json)
//! cargo run --bin timeline-dump
//!
//! # Import a CSV into a scratch store first, then dump
//! TIMELINE_DATA_PATH=/tmp/scratch.json TIMELINE_IMPORT_CSV=war.csv cargo run --bin timeline-dump
//! ```
//!
//! # Environment Variables
//!
//! - `TIMELINE_CONFIG`: Config file (default: ~/.timeline/config.json)
//! - `TIMELINE_DATA_PATH`: Store file, overrides the config
//! - `TIMELINE_IMPORT_CSV`: CSV file to import before dumping
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use timeline_core::db::JsonFileStore;
use timeline_core::interchange::import_csv;
use timeline_core::models::TimelineNode;
use timeline_core::{TimelineConfig, TimelineService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = match env::var_os("TIMELINE_CONFIG") {
        Some(path) => PathBuf::from(path),
        None => dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Failed to get home directory"))?
            .join(".timeline")
            .join("config.json"),
    };
    let config = TimelineConfig::load(&config_path).await?.with_env_overrides();
    config.validate()?;

    let data_path = config.resolve_data_path()?;
    tracing::info!("Store: {}", data_path.display());

    let store = Arc::new(JsonFileStore::open(data_path).await?);
    let service = TimelineService::with_config(store, &config)?;

    let swept = service.sweep_orphans().await?;
    if swept > 0 {
        tracing::warn!("Removed {} orphaned records", swept);
    }

    if let Some(csv_path) = env::var_os("TIMELINE_IMPORT_CSV") {
        let file = std::fs::File::open(&csv_path)?;
        let report = import_csv(&service, file, config.csv_delimiter_byte()).await?;
        tracing::info!(
            "Imported {} timelines, {} nodes from {:?}",
            report.timeline_ids.len(),
            report.node_count(),
            csv_path
        );
    }

    let timelines = service.list_timelines().await?;
    if timelines.is_empty() {
        println!("(no timelines)");
    }

    for timeline in timelines {
        let tree = service.timeline_tree(&timeline.id).await?;
        let label = if timeline.is_fictional { "fictional" } else { "real" };
        println!("{} [{}] ({} nodes)", timeline.title, label, tree.node_count());
        for era in &tree.eras {
            println!("  {}", describe(&era.era));
            for event in &era.events {
                println!("    {}", describe(&event.event));
                for scene in &event.scenes {
                    println!("      {}", describe(scene));
                }
            }
        }
    }

    Ok(())
}

fn describe(node: &TimelineNode) -> String {
    let mut line = node.title.clone();
    if let Some(time) = node.sort_time().filter(|t| !t.trim().is_empty()) {
        line.push_str(&format!(" @ {time}"));
    }
    if let Some((anchor, side)) = node.relative_anchor() {
        line.push_str(&format!(" ({} {})", side.as_str(), anchor));
    }
    line.push_str(&format!(" #{}", node.order));
    line
}
