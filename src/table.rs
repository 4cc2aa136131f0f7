// 📋 Record Table - generic soft-delete-aware table over a TableStore
//
// One implementation serves every entity kind; behaviour differences
// (required fields, patchable fields, unique key, soft delete, default
// sort) all come from the TableSchema it is built with.

use crate::error::{RosterError, RosterResult};
use crate::schema::{FieldKind, SortOrder, TableSchema, CREATED_AT, ID_FIELD, UPDATED_AT};
use crate::store::{CellValue, Row, TableStore};
use chrono::Utc;
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Sort parameters for list queries. Unset values use the schema defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
}

impl ListQuery {
    pub fn new(sort_by: Option<String>, order: Option<SortOrder>) -> Self {
        ListQuery { sort_by, order }
    }

    pub fn sorted(sort_by: &str, order: SortOrder) -> Self {
        ListQuery {
            sort_by: Some(sort_by.to_string()),
            order: Some(order),
        }
    }
}

#[derive(Clone)]
pub struct RecordTable {
    schema: TableSchema,
    store: Arc<dyn TableStore>,
}

impl RecordTable {
    pub fn new(schema: TableSchema, store: Arc<dyn TableStore>) -> Self {
        RecordTable { schema, store }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// All live rows, sorted.
    pub fn list(&self, query: &ListQuery) -> RosterResult<Vec<Row>> {
        self.list_where(query, |_| true)
    }

    /// Live rows matching `predicate`, sorted.
    pub fn list_where<F>(&self, query: &ListQuery, predicate: F) -> RosterResult<Vec<Row>>
    where
        F: Fn(&Row) -> bool,
    {
        let mut rows: Vec<Row> = self
            .live_rows()?
            .into_iter()
            .map(|(_, row)| row)
            .filter(|row| predicate(row))
            .collect();

        let key = query.sort_by.as_deref().unwrap_or(self.schema.default_sort);
        let order = query.order.unwrap_or(self.schema.default_order);
        let kind = self.schema.field(key).map(|f| f.kind);

        rows.sort_by(|a, b| {
            let ord = compare_cells(cell(a, key), cell(b, key), kind);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        debug!(table = self.schema.table, sort_by = key, %order, count = rows.len(), "listed rows");
        Ok(rows)
    }

    /// Exact-match lookup by identifier. Soft-deleted rows are not found.
    pub fn get_by_id(&self, id: &str) -> RosterResult<Row> {
        self.locate(id).map(|(_, row)| row)
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Validate and append a new row, returning its fresh identifier.
    ///
    /// Unknown and system-managed fields in `fields` are ignored.
    pub fn add(&self, fields: Row) -> RosterResult<String> {
        let mut row: Row = fields
            .into_iter()
            .filter(|(name, _)| self.schema.is_insertable(name))
            .map(|(name, value)| {
                let value = self.schema.coerce(&name, value);
                (name, value)
            })
            .collect();

        self.schema.validate_required(&row)?;

        if let Some(unique) = self.schema.unique {
            if let Some(value) = row.get(unique) {
                self.ensure_unique(unique, value, None)?;
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        for field in self.schema.fields {
            let value = match field.name {
                ID_FIELD => CellValue::Text(id.clone()),
                CREATED_AT | UPDATED_AT => CellValue::Timestamp(now),
                name if self.schema.soft_delete == Some(name) => CellValue::Flag(false),
                name => row.remove(name).unwrap_or_else(|| CellValue::Text(String::new())),
            };
            row.insert(field.name.to_string(), value);
        }

        self.store.append_row(self.schema.table, row)?;
        info!(table = self.schema.table, %id, "row appended");

        Ok(id)
    }

    /// Apply whitelisted field changes to an existing row.
    ///
    /// Non-patchable fields are dropped; `updated_at` is always refreshed.
    pub fn update(&self, id: &str, fields: Row) -> RosterResult<()> {
        let (position, _) = self.locate(id)?;

        let patch: Vec<(String, CellValue)> = fields
            .into_iter()
            .filter(|(name, _)| self.schema.is_patchable(name))
            .map(|(name, value)| {
                let value = self.schema.coerce(&name, value);
                (name, value)
            })
            .collect();

        for (name, value) in &patch {
            if value.is_blank() && self.schema.required.contains(&name.as_str()) {
                return Err(RosterError::required(name));
            }
        }

        if let Some(unique) = self.schema.unique {
            if let Some((_, value)) = patch.iter().find(|(name, _)| name == unique) {
                self.ensure_unique(unique, value, Some(id))?;
            }
        }

        let changed: Vec<&str> = patch.iter().map(|(name, _)| name.as_str()).collect();
        debug!(table = self.schema.table, %id, fields = ?changed, "patching row");

        for (name, value) in patch {
            self.store.write_cell(self.schema.table, position, &name, value)?;
        }
        self.touch(position)?;

        info!(table = self.schema.table, %id, "row updated");
        Ok(())
    }

    /// Flag a row as deleted. The row stays in storage.
    pub fn soft_delete(&self, id: &str) -> RosterResult<()> {
        let Some(flag) = self.schema.soft_delete else {
            return Err(RosterError::Validation(format!(
                "{} does not support deletion",
                self.schema.entity
            )));
        };

        let (position, _) = self.locate(id)?;
        self.store
            .write_cell(self.schema.table, position, flag, CellValue::Flag(true))?;
        self.touch(position)?;

        info!(table = self.schema.table, %id, "row soft-deleted");
        Ok(())
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn is_live(&self, row: &Row) -> bool {
        match self.schema.soft_delete {
            Some(flag) => !row.get(flag).is_some_and(CellValue::as_flag),
            None => true,
        }
    }

    /// Live rows paired with their store position.
    fn live_rows(&self) -> RosterResult<Vec<(usize, Row)>> {
        let rows = self.store.read_all(self.schema.table)?;
        Ok(rows
            .into_iter()
            .enumerate()
            .filter(|(_, row)| self.is_live(row))
            .collect())
    }

    fn locate(&self, id: &str) -> RosterResult<(usize, Row)> {
        self.live_rows()?
            .into_iter()
            .find(|(_, row)| cell(row, ID_FIELD).to_string() == id)
            .ok_or_else(|| RosterError::not_found(self.schema.entity, id))
    }

    /// Read-then-check uniqueness among live rows, skipping `except_id`.
    fn ensure_unique(&self, field: &str, value: &CellValue, except_id: Option<&str>)
        -> RosterResult<()> {
        let wanted = value.to_string();
        let taken = self.live_rows()?.into_iter().any(|(_, row)| {
            let same_row = except_id.is_some_and(|id| cell(&row, ID_FIELD).to_string() == id);
            !same_row && cell(&row, field).to_string() == wanted
        });

        if taken {
            return Err(RosterError::Conflict(format!(
                "{} {} is already registered",
                field, wanted
            )));
        }
        Ok(())
    }

    fn touch(&self, position: usize) -> RosterResult<()> {
        self.store.write_cell(
            self.schema.table,
            position,
            UPDATED_AT,
            CellValue::Timestamp(Utc::now()),
        )?;
        Ok(())
    }
}

static EMPTY: CellValue = CellValue::Empty;

fn cell<'a>(row: &'a Row, name: &str) -> &'a CellValue {
    row.get(name).unwrap_or(&EMPTY)
}

/// Ordering used by list queries.
///
/// Date fields compare by calendar date whenever both sides are typed dates
/// or text that parses as one; timestamps compare by instant; numbers
/// numerically. Everything else compares as case-insensitive text, with
/// absent values as the empty string.
pub fn compare_cells(a: &CellValue, b: &CellValue, kind: Option<FieldKind>) -> Ordering {
    match (a, b) {
        (CellValue::Timestamp(x), CellValue::Timestamp(y)) => return x.cmp(y),
        (CellValue::Number(x), CellValue::Number(y)) => {
            return x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        _ => {}
    }

    if kind == Some(FieldKind::Date) {
        if let (Some(x), Some(y)) = (a.as_date(), b.as_date()) {
            return x.cmp(&y);
        }
    }

    a.to_string().to_lowercase().cmp(&b.to_string().to_lowercase())
}
