//! Export dashboard tables to CSV and JSON.
//!
//! The CSV is meant to be easy to consume in spreadsheets; the JSON carries
//! every derived table for downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::app::pipeline::RunOutput;
use crate::domain::Table;
use crate::error::AppError;

/// Write a wide table to CSV: `date` then one column per series.
///
/// Absent cells are written as empty fields.
pub fn write_display_csv(path: &Path, table: &Table) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_table_csv(BufWriter::new(file), table)
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV: {e}")))
}

pub fn write_table_csv<W: Write>(out: W, table: &Table) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    let mut header = vec!["date"];
    header.extend(table.columns.iter().map(String::as_str));
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.date.to_string()];
        for col in &table.columns {
            record.push(row.get(col).map(|v| format!("{v:.3}")).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the full run (display, composition, growth, deltas, stress,
/// failures) as pretty JSON.
pub fn write_run_json(path: &Path, run: &RunOutput) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), run)
        .map_err(|e| AppError::new(4, format!("Failed to write export JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Row;
    use chrono::NaiveDate;

    #[test]
    fn absent_cells_are_empty_fields() {
        let mut r1 = Row::new(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        r1.values.insert("Total Assets".into(), 7712.5);
        let mut r2 = Row::new(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        r2.values.insert("Total Assets".into(), 7700.0);
        r2.values.insert("Loans, other".into(), 1.25);

        let table = Table {
            columns: vec!["Total Assets".into(), "Loans, other".into()],
            rows: vec![r1, r2],
        };

        let mut buf = Vec::new();
        write_table_csv(&mut buf, &table).unwrap();
        let txt = String::from_utf8(buf).unwrap();
        assert_eq!(
            txt,
            concat!(
                "date,Total Assets,\"Loans, other\"\n",
                "2024-01-03,7712.500,\n",
                "2024-01-10,7700.000,1.250\n",
            )
        );
    }

    #[test]
    fn quotes_in_labels_are_escaped() {
        let mut r1 = Row::new(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        r1.values.insert("Say \"hi\"".into(), 2.0);
        let table = Table {
            columns: vec!["Say \"hi\"".into()],
            rows: vec![r1],
        };

        let mut buf = Vec::new();
        write_table_csv(&mut buf, &table).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "date,\"Say \"\"hi\"\"\"\n2024-01-03,2.000\n"
        );
    }
}
