//! Delimited-file import and export
//!
//! `.csv` files are comma separated and may carry `#` comment lines (the
//! term mapper writes its run parameters that way); everything else is read
//! and written as tab separated.

use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use super::{Table, Value};
use crate::error::Result;

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Read a delimited file with a header row into a [`Table`], typing
/// numeric columns
pub fn read_table(path: &Path) -> Result<Table> {
    let mut table = read_raw_table(path)?;
    table.parse_numeric_columns();
    Ok(table)
}

/// Read a delimited file keeping every non-blank cell as text
pub fn read_raw_table(path: &Path) -> Result<Table> {
    let csv = is_csv(path);
    let mut reader = ReaderBuilder::new()
        .delimiter(if csv { b',' } else { b'\t' })
        .comment(if csv { Some(b'#') } else { None })
        .flexible(true)
        .has_headers(true)
        .from_path(path)?;

    let mut table = Table::new(reader.headers()?.iter().map(str::to_string));
    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(Value::raw).collect());
    }

    tracing::debug!(path = %path.display(), rows = table.len(), "Read delimited table");
    Ok(table)
}

/// Write a [`Table`] as a delimited file, creating parent directories
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new()
        .delimiter(if is_csv(path) { b',' } else { b'\t' })
        .from_path(path)?;

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;

    tracing::debug!(path = %path.display(), rows = table.len(), "Wrote delimited table");
    Ok(())
}
