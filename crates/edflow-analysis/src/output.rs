//! Writers for the pipeline outputs

use std::io::{self, Write};

use crate::{cleaner::CleanedTable, segment::LongRow};

/// Writes the cleaned table as CSV, one row per retained visit.
///
/// A missing priority is written as an empty cell.
pub fn write_cleaned_csv<W: Write>(writer: W, table: &CleanedTable) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([
        "visit_id",
        "category",
        "sub_category",
        "priority",
        "triage_queue",
        "triage_duration",
        "service_queue",
        "service_duration",
    ])?;
    for row in &table.rows {
        let visit = &row.visit;
        let durations = &row.durations;
        writer.write_record([
            visit.id.clone(),
            visit.category.clone(),
            visit.sub_category.clone(),
            visit.priority.map(|p| p.to_string()).unwrap_or_default(),
            durations.triage_queue.to_string(),
            durations.triage_duration.to_string(),
            durations.service_queue.to_string(),
            durations.service_duration.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes one gap in seconds per line.
pub fn write_gaps<W: Write>(mut writer: W, gaps: &[f64]) -> io::Result<()> {
    for gap in gaps {
        writeln!(writer, "{gap}")?;
    }
    writer.flush()
}

pub fn write_long_form_csv<W: Write>(writer: W, rows: &[LongRow]) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
