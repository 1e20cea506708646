//! DuckDB store for the flattened source tables

use std::path::Path;

use duckdb::{params, params_from_iter, Connection};
use tracing::{debug, info};

use crate::db::schema::{self, quote_ident};
use crate::db::{RawTable, SourceTables, TableName};
use crate::error::{HealthError, Result};

/// Column written for a collection that had no rows, so the table still exists
pub const EMPTY_TABLE_MARKER: &str = "__empty__";

/// DuckDB database holding the `records`, `workouts` and `activities` tables
pub struct HealthStore {
    conn: Connection,
}

impl HealthStore {
    /// Open or create the database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::config::ensure_dir(parent)?;
        }

        let conn = Connection::open(path).map_err(|e| {
            HealthError::Database(format!("Failed to open database {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "opened database");

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| HealthError::Database(format!("Failed to open in-memory database: {}", e)))?;
        Ok(Self { conn })
    }

    pub fn table_exists(&self, name: TableName) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(schema::TABLE_EXISTS_SQL, params![name.as_str()], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Whether all three source tables are present
    pub fn tables_exist(&self) -> Result<bool> {
        for name in TableName::ALL {
            if !self.table_exists(name)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Row count of a table, `None` if it does not exist
    pub fn table_row_count(&self, name: TableName) -> Result<Option<i64>> {
        if !self.table_exists(name)? {
            return Ok(None);
        }
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(name.as_str()));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(Some(count))
    }

    /// Create the table and fill it, unless a table of that name already exists.
    ///
    /// Returns the number of rows written (0 when the table was kept).
    pub fn write_table(&mut self, table: &RawTable) -> Result<usize> {
        let exists: i64 = self
            .conn
            .query_row(schema::TABLE_EXISTS_SQL, params![table.name], |row| row.get(0))?;
        if exists > 0 {
            debug!(table = %table.name, "table exists, keeping it");
            return Ok(0);
        }

        let stored = if table.columns.is_empty() {
            RawTable::new(table.name.clone(), vec![EMPTY_TABLE_MARKER.to_string()])
        } else {
            table.clone()
        };

        let tx = self.conn.transaction()?;
        tx.execute(&schema::create_table_sql(&stored), [])?;
        if !table.columns.is_empty() {
            let mut stmt = tx.prepare(&schema::insert_sql(&stored))?;
            for row in &table.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        info!(table = %table.name, rows = table.len(), "wrote table");
        Ok(table.len())
    }

    /// Write all three source tables
    pub fn write_tables(&mut self, tables: &SourceTables) -> Result<()> {
        for (_, table) in tables.iter() {
            self.write_table(table)?;
        }
        Ok(())
    }

    /// Read a table back with its stored column order and row order
    pub fn read_table(&self, name: TableName) -> Result<RawTable> {
        let mut stmt = self.conn.prepare(schema::TABLE_COLUMNS_SQL)?;
        let mut columns: Vec<String> = stmt
            .query_map(params![name.as_str()], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;

        if columns.is_empty() {
            return Err(HealthError::Database(format!("Table '{}' does not exist", name)));
        }
        if columns == [EMPTY_TABLE_MARKER] {
            columns.clear();
            return Ok(RawTable::new(name.as_str(), columns));
        }

        let sql = format!("{} ORDER BY rowid", schema::select_sql(name.as_str(), &columns));
        let width = columns.len();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Option<String>>(i))
                    .collect::<duckdb::Result<Vec<_>>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(RawTable {
            name: name.as_str().to_string(),
            columns,
            rows,
        })
    }

    /// Read all three source tables
    pub fn read_tables(&self) -> Result<SourceTables> {
        Ok(SourceTables {
            records: self.read_table(TableName::Records)?,
            workouts: self.read_table(TableName::Workouts)?,
            activities: self.read_table(TableName::Activities)?,
        })
    }

    /// Drop all three source tables
    pub fn drop_tables(&self) -> Result<()> {
        for name in TableName::ALL {
            self.conn.execute(
                &format!("DROP TABLE IF EXISTS {}", quote_ident(name.as_str())),
                [],
            )?;
        }
        info!("dropped source tables");
        Ok(())
    }

    /// Close the connection, reporting any error from the database
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| HealthError::from(e))
    }
}
