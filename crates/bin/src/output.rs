//! Output formatting helpers for human-readable and JSON output.

use sortable::{PositionAccessor, Record};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Print a table with aligned columns in human-readable format.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    // Calculate column widths (max of header and all row values)
    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:<width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_line.join("  ").trim_end());

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .take(col_count)
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        println!("{}", line.join("  ").trim_end());
    }
}

/// Render a tombstone timestamp (milliseconds since the epoch) as UTC.
pub fn format_deleted_at(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn record_row(record: &Record, with_deleted_at: bool) -> Vec<String> {
    let mut row = vec![
        record
            .position()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string()),
        record.id().to_string(),
        record.payload().to_string(),
    ];
    if with_deleted_at {
        row.push(record.deleted_at().map(format_deleted_at).unwrap_or_default());
    }
    row
}

/// Print records as a table, or as a JSON array.
pub fn print_records(
    records: &[Record],
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Human => {
            if records.is_empty() {
                println!("No records found.");
                return Ok(());
            }
            let with_deleted_at = records.iter().any(Record::is_trashed);
            let rows: Vec<_> = records
                .iter()
                .map(|record| record_row(record, with_deleted_at))
                .collect();
            if with_deleted_at {
                print_table(&["POSITION", "ID", "PAYLOAD", "DELETED AT"], &rows);
            } else {
                print_table(&["POSITION", "ID", "PAYLOAD"], &rows);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(records)?),
    }
    Ok(())
}

/// Print a single record.
pub fn print_record(
    record: &Record,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Human => print_records(std::slice::from_ref(record), format),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(record)?);
            Ok(())
        }
    }
}
