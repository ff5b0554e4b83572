use std::io::BufWriter;

use crate::error::Result;
use crate::runner::SelectionReport;

pub(crate) fn export_to_json_impl(reports: &[SelectionReport], file: std::fs::File) -> Result<()> {
    serde_json::to_writer_pretty(BufWriter::new(file), reports)?;
    Ok(())
}
