//! Report export.
//!
//! JSON keeps the full reports, outcome included. CSV flattens them to one
//! row per scenario per report so repeated runs can be analysed in a
//! spreadsheet or dataframe.

use std::path::Path;

use crate::error::Result;
use crate::runner::SelectionReport;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/json.rs"]
mod json;
#[path = "export/writer_utils.rs"]
mod writer_utils;

/// Export selection reports to JSON format.
///
/// Creates a JSON file holding a pretty-printed array of the full reports,
/// outcome and per-scenario rows included.
///
/// # Arguments
///
/// * `reports` - Reports to export, in the order they should appear
/// * `path` - Path to output JSON file
///
/// # Errors
///
/// Returns [`ExperimentError::NoResults`](crate::error::ExperimentError::NoResults)
/// when `reports` is empty, and an I/O or JSON error if file creation or
/// serialization fails.
pub fn export_to_json(reports: &[SelectionReport], path: impl AsRef<Path>) -> Result<()> {
    writer_utils::ensure_not_empty(reports)?;
    let file = writer_utils::create_output_file(path)?;
    json::export_to_json_impl(reports, file)
}

/// Export selection reports to CSV format.
///
/// Creates a CSV file with one row per scenario per report. Each row
/// repeats the report's experiment id, seed, procedure and termination, and
/// marks the selected scenario.
///
/// # Arguments
///
/// * `reports` - Reports to export
/// * `path` - Path to output CSV file
///
/// # Errors
///
/// Returns [`ExperimentError::NoResults`](crate::error::ExperimentError::NoResults)
/// when `reports` is empty, and an I/O or CSV error if file creation or
/// writing fails.
pub fn export_to_csv(reports: &[SelectionReport], path: impl AsRef<Path>) -> Result<()> {
    writer_utils::ensure_not_empty(reports)?;
    let file = writer_utils::create_output_file(path)?;
    csv::export_to_csv_impl(reports, file)
}
