// SQLite-backed tables.
//
// One SQL table per entity schema. `row_index` keeps append order; every
// schema column is a TEXT column holding the JSON-encoded CellValue, so
// typed cells come back exactly as written.

use super::{CellValue, Row, TableStore};
use crate::schema::TableSchema;
use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    /// table name → column names, fixed at open time
    columns: HashMap<String, Vec<String>>,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure every table exists.
    pub fn open(path: &Path, schemas: &[TableSchema]) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn, schemas)
    }

    pub fn open_in_memory(schemas: &[TableSchema]) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, schemas)
    }

    fn with_connection(conn: Connection, schemas: &[TableSchema]) -> Result<Self> {
        let mut columns = HashMap::new();
        for schema in schemas {
            setup_table(&conn, schema)?;
            columns.insert(
                schema.table.to_string(),
                schema.column_names().map(str::to_string).collect(),
            );
        }

        Ok(SqliteStore {
            conn: Mutex::new(conn),
            columns,
        })
    }

    fn columns_of(&self, table: &str) -> Result<&[String]> {
        self.columns
            .get(table)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow!("unknown table {}", table))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("sqlite connection lock poisoned"))
    }
}

fn setup_table(conn: &Connection, schema: &TableSchema) -> Result<()> {
    let column_defs: Vec<String> = schema
        .column_names()
        .map(|name| format!("{} TEXT", quote(name)))
        .collect();

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                row_index INTEGER PRIMARY KEY AUTOINCREMENT,
                {}
            )",
            quote(schema.table),
            column_defs.join(",\n                ")
        ),
        [],
    )
    .with_context(|| format!("Failed to create table {}", schema.table))?;

    Ok(())
}

/// Identifiers come from static schemas, quoting only guards odd names.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn encode(value: &CellValue) -> Result<String> {
    serde_json::to_string(value).context("Failed to encode cell")
}

fn decode(text: Option<String>) -> Result<CellValue> {
    match text {
        None => Ok(CellValue::Empty),
        Some(json) => serde_json::from_str(&json).context("Failed to decode cell"),
    }
}

impl TableStore for SqliteStore {
    fn read_all(&self, table: &str) -> Result<Vec<Row>> {
        let columns = self.columns_of(table)?;
        let select = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY row_index",
            select,
            quote(table)
        ))?;

        let raw_rows = stmt
            .query_map([], |row| {
                (0..columns.len())
                    .map(|i| row.get::<_, Option<String>>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        raw_rows
            .into_iter()
            .map(|cells| {
                columns
                    .iter()
                    .cloned()
                    .zip(cells)
                    .map(|(name, cell)| Ok((name, decode(cell)?)))
                    .collect::<Result<Row>>()
            })
            .collect()
    }

    fn append_row(&self, table: &str, row: Row) -> Result<()> {
        let columns = self.columns_of(table)?;
        let values = columns
            .iter()
            .map(|c| encode(row.get(c).unwrap_or(&CellValue::Empty)))
            .collect::<Result<Vec<_>>>()?;

        let names = columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(table),
                names,
                placeholders
            ),
            params_from_iter(values),
        )
        .with_context(|| format!("Failed to append row to {}", table))?;

        Ok(())
    }

    fn write_cell(&self, table: &str, row_index: usize, column: &str, value: CellValue)
        -> Result<()> {
        let columns = self.columns_of(table)?;
        if !columns.iter().any(|c| c == column) {
            bail!("unknown column {} in table {}", column, table);
        }

        let conn = self.lock()?;
        let offset = i64::try_from(row_index)?;
        let key: Option<i64> = conn
            .query_row(
                &format!(
                    "SELECT row_index FROM {} ORDER BY row_index LIMIT 1 OFFSET ?1",
                    quote(table)
                ),
                params![offset],
                |row| row.get(0),
            )
            .optional()?;

        let Some(key) = key else {
            bail!("row {} not found in table {}", row_index, table);
        };

        conn.execute(
            &format!(
                "UPDATE {} SET {} = ?1 WHERE row_index = ?2",
                quote(table),
                quote(column)
            ),
            params![encode(&value)?, key],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ALL_TABLES, PLAYERS};
    use chrono::{NaiveDate, Utc};

    fn player_row(name: &str) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), CellValue::from(name));
        row.insert("is_deleted".to_string(), CellValue::Flag(false));
        row
    }

    #[test]
    fn test_cells_round_trip_typed() {
        let store = SqliteStore::open_in_memory(&ALL_TABLES).unwrap();
        let now = Utc::now();
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();

        let mut row = Row::new();
        row.insert("race_name".to_string(), CellValue::from("Spring Relay"));
        row.insert("date".to_string(), CellValue::Date(date));
        row.insert("created_at".to_string(), CellValue::Timestamp(now));
        store.append_row("Records", row).unwrap();

        let rows = store.read_all("Records").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["race_name"], CellValue::from("Spring Relay"));
        assert_eq!(rows[0]["date"], CellValue::Date(date));
        assert_eq!(rows[0]["created_at"], CellValue::Timestamp(now));
        // Columns never written read back as empty
        assert_eq!(rows[0]["memo"], CellValue::Empty);
    }

    #[test]
    fn test_write_cell_by_position() {
        let store = SqliteStore::open_in_memory(&[PLAYERS]).unwrap();
        store.append_row("Players", player_row("A")).unwrap();
        store.append_row("Players", player_row("B")).unwrap();

        store
            .write_cell("Players", 1, "is_deleted", CellValue::Flag(true))
            .unwrap();

        let rows = store.read_all("Players").unwrap();
        assert_eq!(rows[0]["is_deleted"], CellValue::Flag(false));
        assert_eq!(rows[1]["is_deleted"], CellValue::Flag(true));
    }

    #[test]
    fn test_rejects_unknown_table_and_column() {
        let store = SqliteStore::open_in_memory(&[PLAYERS]).unwrap();
        store.append_row("Players", player_row("A")).unwrap();

        assert!(store.read_all("Nope").is_err());
        assert!(store
            .write_cell("Players", 0, "nickname", CellValue::Empty)
            .is_err());
        assert!(store
            .write_cell("Players", 5, "name", CellValue::Empty)
            .is_err());
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.db");

        {
            let store = SqliteStore::open(&path, &ALL_TABLES).unwrap();
            store.append_row("Players", player_row("Persisted")).unwrap();
        }

        let reopened = SqliteStore::open(&path, &ALL_TABLES).unwrap();
        let rows = reopened.read_all("Players").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], CellValue::from("Persisted"));
    }
}
