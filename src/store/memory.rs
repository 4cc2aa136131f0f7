// In-memory tables. Append-only; cells are rewritten in place.

use super::{CellValue, Row, TableStore};
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Tables held in process memory.
///
/// Cloning shares the same underlying tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held for a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(table).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl TableStore for MemoryStore {
    fn read_all(&self, table: &str) -> Result<Vec<Row>> {
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(tables.get(table).cloned().unwrap_or_default())
    }

    fn append_row(&self, table: &str, row: Row) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        tables.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    fn write_cell(&self, table: &str, row_index: usize, column: &str, value: CellValue)
        -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;

        let Some(row) = tables.get_mut(table).and_then(|rows| rows.get_mut(row_index)) else {
            bail!("row {} not found in table {}", row_index, table);
        };
        row.insert(column.to_string(), value);
        Ok(())
    }
}
