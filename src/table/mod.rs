//! In-memory tabular datasets
//!
//! Every stage of the build hands data to the next as a [`Table`]: an ordered
//! list of column names plus rows of loosely typed [`Value`]s. Storage types
//! are inferred per column when a table is written to SQLite.
//!
//! # Submodules
//!
//! - [`delimited`] - TSV/CSV import and export

pub mod delimited;

use std::collections::HashMap;
use std::fmt;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::ToSql;

pub use delimited::{read_raw_table, read_table, write_table};

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Raw cell from a delimited file: blank → Null, anything else is kept
    /// as the original text
    pub fn raw(cell: &str) -> Self {
        if cell.trim().is_empty() {
            Value::Null
        } else {
            Value::Text(cell.to_string())
        }
    }

    /// Text rendering, `None` for nulls
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    /// Column type this single value would require
    fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ColumnType::Integer),
            Value::Real(_) => Some(ColumnType::Real),
            Value::Text(_) => Some(ColumnType::Text),
        }
    }
}

/// Numeric reading of one raw cell
///
/// Integers are only recognised in canonical form so identifiers such as
/// `007` keep their text. All-digit literals beyond `i64` stay text as well.
fn parse_numeric(raw: &str) -> Option<Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return (i.to_string() == raw).then_some(Value::Integer(i));
    }
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !raw.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::Real)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(n as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Value::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

/// SQL storage class inferred for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    /// Widen two observed types to one that holds both
    fn unify(self, other: ColumnType) -> ColumnType {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnType::Integer, ColumnType::Real) | (ColumnType::Real, ColumnType::Integer) => {
                ColumnType::Real
            }
            _ => ColumnType::Text,
        }
    }
}

/// An ordered, column-named dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row, padding short rows with nulls and truncating long ones
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Cell at `row` in column `column`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Iterate one column's values
    pub fn column_values<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a Value>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Keep only the rows for which `keep` returns true
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[String], &[Value]) -> bool) {
        let columns = &self.columns;
        self.rows.retain(|row| keep(columns, row));
    }

    /// Drop the named columns; names that are absent are ignored
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(&c.as_str()))
            .collect();
        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
    }

    /// Rename a column; returns false when it does not exist
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Append a column computed from each existing row
    pub fn add_column(&mut self, name: &str, mut compute: impl FnMut(&[String], &[Value]) -> Value) {
        let columns = self.columns.clone();
        for row in &mut self.rows {
            let value = compute(&columns, row);
            row.push(value);
        }
        self.columns.push(name.to_string());
    }

    /// Convert every text column whose non-null cells all read as numbers
    pub fn parse_numeric_columns(&mut self) {
        for idx in 0..self.columns.len() {
            self.parse_numeric_at(idx);
        }
    }

    /// Convert one column to numbers when all of its non-null cells read as
    /// numbers; returns false when the column is absent or stays text
    pub fn parse_numeric_column(&mut self, column: &str) -> bool {
        match self.column_index(column) {
            Some(idx) => self.parse_numeric_at(idx),
            None => false,
        }
    }

    fn parse_numeric_at(&mut self, idx: usize) -> bool {
        let mut parsed = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let value = match &row[idx] {
                Value::Text(s) => match parse_numeric(s.trim()) {
                    Some(number) => number,
                    None => return false,
                },
                other => other.clone(),
            };
            parsed.push(value);
        }
        for (row, value) in self.rows.iter_mut().zip(parsed) {
            row[idx] = value;
        }
        true
    }

    /// Storage type per column: all-integer → INTEGER, numeric with at least
    /// one real → REAL, anything else (including all-null) → TEXT
    pub fn infer_column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len())
            .map(|idx| {
                self.rows
                    .iter()
                    .filter_map(|row| row[idx].column_type())
                    .reduce(ColumnType::unify)
                    .unwrap_or(ColumnType::Text)
            })
            .collect()
    }

    /// Inner join on a column present in both tables
    ///
    /// Output columns are this table's columns followed by `other`'s minus
    /// the join column. Left row order is preserved; null keys never match.
    pub fn inner_join(&self, other: &Table, on: &str) -> Option<Table> {
        let left_idx = self.column_index(on)?;
        let right_idx = other.column_index(on)?;

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in other.rows.iter().enumerate() {
            if let Some(key) = row[right_idx].as_text() {
                index.entry(key).or_default().push(i);
            }
        }

        let mut columns = self.columns.clone();
        columns.extend(
            other
                .columns
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != right_idx)
                .map(|(_, c)| c.clone()),
        );
        let mut joined = Table::new(columns);

        for row in &self.rows {
            let Some(key) = row[left_idx].as_text() else {
                continue;
            };
            for &i in index.get(&key).map(Vec::as_slice).unwrap_or(&[]) {
                let mut merged = row.clone();
                merged.extend(
                    other.rows[i]
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != right_idx)
                        .map(|(_, v)| v.clone()),
                );
                joined.rows.push(merged);
            }
        }

        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_cells() {
        assert_eq!(Value::raw(""), Value::Null);
        assert_eq!(Value::raw("  "), Value::Null);
        assert_eq!(Value::raw("2.50"), Value::Text("2.50".into()));
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric("42"), Some(Value::Integer(42)));
        assert_eq!(parse_numeric("-3"), Some(Value::Integer(-3)));
        assert_eq!(parse_numeric("0.75"), Some(Value::Real(0.75)));
        assert_eq!(parse_numeric("1e3"), Some(Value::Real(1000.0)));
        assert_eq!(parse_numeric("007"), None);
        assert_eq!(parse_numeric("12345678901234567890"), None);
        assert_eq!(parse_numeric("nan"), None);
        assert_eq!(parse_numeric("inf"), None);
        assert_eq!(parse_numeric("ukb-b-1234"), None);
    }

    #[test]
    fn test_numeric_columns_need_every_cell() {
        let mut table = Table::new(["id", "note", "beta", "missing"]);
        table.push_row(vec!["1".into(), "1.10".into(), "0.5".into(), Value::Null]);
        table.push_row(vec!["2".into(), "abc".into(), "2".into(), Value::Null]);
        table.push_row(vec!["3".into(), "2.50".into(), Value::Null, Value::Null]);

        table.parse_numeric_columns();

        let column = |name: &str| table.column_values(name).unwrap().cloned().collect::<Vec<_>>();
        assert_eq!(column("id"), vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]);
        assert_eq!(
            column("note"),
            vec![Value::from("1.10"), Value::from("abc"), Value::from("2.50")]
        );
        assert_eq!(column("beta"), vec![Value::Real(0.5), Value::Integer(2), Value::Null]);
        assert_eq!(column("missing"), vec![Value::Null; 3]);
    }

    #[test]
    fn test_parse_single_column() {
        let mut table = Table::new(["pmid", "year"]);
        table.push_row(vec!["25673413".into(), "2015".into()]);

        assert!(table.parse_numeric_column("pmid"));
        assert!(!table.parse_numeric_column("absent"));
        assert_eq!(table.get(0, "pmid"), Some(&Value::Integer(25673413)));
        assert_eq!(table.get(0, "year"), Some(&Value::from("2015")));
    }

    #[test]
    fn test_infer_column_types() {
        let mut table = Table::new(["id", "score", "mixed", "empty", "label"]);
        table.push_row(vec![1i64.into(), 0.5.into(), 1i64.into(), Value::Null, "a".into()]);
        table.push_row(vec![2i64.into(), 1i64.into(), 2.5.into(), Value::Null, "b".into()]);
        table.push_row(vec![Value::Null, Value::Null, "x".into(), Value::Null, "c".into()]);

        assert_eq!(
            table.infer_column_types(),
            vec![
                ColumnType::Integer,
                ColumnType::Real,
                ColumnType::Text,
                ColumnType::Text,
                ColumnType::Text
            ]
        );
    }

    #[test]
    fn test_drop_and_rename_columns() {
        let mut table = Table::new(["stanza", "subject", "predicate", "value"]);
        table.push_row(vec!["s".into(), "EFO:1".into(), "rdfs:label".into(), "x".into()]);

        table.drop_columns(&["stanza", "predicate", "language"]);
        assert!(table.rename_column("value", "object"));
        assert!(!table.rename_column("missing", "other"));

        assert_eq!(table.columns(), ["subject", "object"]);
        assert_eq!(table.rows()[0], vec![Value::from("EFO:1"), Value::from("x")]);
    }

    #[test]
    fn test_push_row_pads() {
        let mut table = Table::new(["a", "b"]);
        table.push_row(vec!["only".into()]);
        assert_eq!(table.get(0, "b"), Some(&Value::Null));
    }

    #[test]
    fn test_inner_join_drops_unmatched() {
        let mut labels = Table::new(["subject", "object", "IRI"]);
        labels.push_row(vec!["EFO:1".into(), "disease".into(), "http://x/EFO_1".into()]);
        labels.push_row(vec!["EFO:2".into(), "trait".into(), "http://x/EFO_2".into()]);

        let mut counts = Table::new(["IRI", "Direct", "Inherited"]);
        counts.push_row(vec!["http://x/EFO_2".into(), 3i64.into(), 1i64.into()]);

        let joined = labels.inner_join(&counts, "IRI").unwrap();
        assert_eq!(joined.columns(), ["subject", "object", "IRI", "Direct", "Inherited"]);
        assert_eq!(joined.len(), 1);
        assert_eq!(joined.get(0, "Direct"), Some(&Value::Integer(3)));
        assert!(labels.inner_join(&counts, "missing").is_none());
    }
}
