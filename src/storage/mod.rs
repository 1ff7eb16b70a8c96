//! SQLite database assembly
//!
//! Every dataset produced by a build is written as one table of a single
//! database file. Writes replace: an existing table of the same name is
//! dropped and recreated, never appended to. No referential checks are made
//! between tables.
//!
//! # Submodules
//!
//! - [`query`] - Hierarchy-aware lookups against an assembled database

pub mod query;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use crate::error::Result;
use crate::table::{ColumnType, Table, Value};

pub use query::{AnnotatedRecord, QueryTables, TermQuery};

/// Replace `:` with `_` and remove spaces
pub fn sanitize_column_name(name: &str) -> String {
    name.replace(':', "_").replace(' ', "")
}

/// Double-quote an identifier for interpolation into SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ============================================================================
// Schema
// ============================================================================

/// Column names and storage types inferred for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<(String, ColumnType)>,
}

impl TableSchema {
    /// Infer the schema of `table`
    ///
    /// Sanitized names that collide get a numeric suffix; empty names become
    /// `column_<n>`.
    pub fn infer(name: &str, table: &Table) -> Self {
        let mut seen = HashSet::new();
        let columns = table
            .columns()
            .iter()
            .zip(table.infer_column_types())
            .enumerate()
            .map(|(i, (raw, ty))| {
                let mut column = sanitize_column_name(raw);
                if column.is_empty() {
                    column = format!("column_{}", i + 1);
                }
                let base = column.clone();
                let mut n = 2;
                while !seen.insert(column.to_lowercase()) {
                    column = format!("{base}_{n}");
                    n += 1;
                }
                (column, ty)
            })
            .collect();

        Self {
            name: name.to_string(),
            columns,
        }
    }

    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_identifier(name), ty.sql_name()))
            .collect();
        format!(
            "CREATE TABLE {} ({})",
            quote_identifier(&self.name),
            columns.join(", ")
        )
    }

    pub fn insert_sql(&self) -> String {
        let placeholders: Vec<String> = (1..=self.columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {} VALUES ({})",
            quote_identifier(&self.name),
            placeholders.join(", ")
        )
    }
}

// ============================================================================
// Database
// ============================================================================

/// The assembled output database
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open or create the database file, creating parent directories
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened database");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write `table` as `name`, replacing any existing table of that name
    ///
    /// Drop, create and all inserts run in one transaction.
    pub fn import_table(&mut self, name: &str, table: &Table) -> Result<TableSchema> {
        let schema = TableSchema::infer(name, table);
        let tx = self.conn.transaction()?;
        tx.execute(
            &format!("DROP TABLE IF EXISTS {}", quote_identifier(name)),
            [],
        )?;
        tx.execute(&schema.create_sql(), [])?;
        {
            let mut stmt = tx.prepare(&schema.insert_sql())?;
            for row in table.rows() {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        info!(table = name, rows = table.len(), columns = schema.columns.len(), "Imported table");
        Ok(schema)
    }

    /// Read a whole table back
    pub fn read_table(&self, name: &str) -> Result<Table> {
        self.query(&format!("SELECT * FROM {}", quote_identifier(name)), &[])
    }

    /// Run a query with text parameters and collect the result
    pub fn query(&self, sql: &str, params: &[&str]) -> Result<Table> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut table = Table::new(stmt.column_names().into_iter().map(str::to_string));
        let width = table.columns().len();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(Value::from(row.get_ref(i)?));
            }
            table.push_row(values);
        }
        Ok(table)
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    pub fn has_table(&self, name: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        Ok(stmt.exists([name])?)
    }

    pub fn row_count(&self, name: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
