//! Import and export of timelines in external formats
//!
//! Only CSV is supported. Imported records always go through
//! [`crate::services::TimelineService`], so they get fresh ids and the usual
//! parent validation.

pub mod csv;

pub use self::csv::{export_timeline, import_csv, CsvRow, ImportReport};
