// 🗄️ Tabular Store - the only persistence seam
//
// The core reads whole tables, appends rows and rewrites single cells.
// Anything that can do those three things can back the roster:
// - MemoryStore: in-process tables (tests, ephemeral runs)
// - SqliteStore: one SQLite table per entity, cells JSON-encoded

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// CELL VALUE
// ============================================================================

/// A single typed cell.
///
/// Spreadsheet-style storage hands back a mix of text, numbers, booleans
/// and dates, so rows keep that typing instead of flattening to strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Flag(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    /// Empty cell or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Truthiness of a flag cell. Text "TRUE" (any case) counts, since
    /// sheets often hand booleans back as text.
    pub fn as_flag(&self) -> bool {
        match self {
            CellValue::Flag(b) => *b,
            CellValue::Text(s) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Calendar date of this cell, parsing text when needed.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Timestamp(ts) => Some(ts.date_naive()),
            CellValue::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// JSON form used by the service envelope.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Empty => serde_json::Value::String(String::new()),
            CellValue::Text(s) => serde_json::json!(s),
            CellValue::Number(n) => serde_json::json!(n),
            CellValue::Flag(b) => serde_json::json!(b),
            CellValue::Date(d) => serde_json::json!(d.format("%Y-%m-%d").to_string()),
            CellValue::Timestamp(ts) => serde_json::json!(ts.to_rfc3339()),
        }
    }

    /// Convert caller-supplied JSON into a cell. Nested values are kept as
    /// their serialized text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::String(s) => CellValue::Text(s.clone()),
            serde_json::Value::Bool(b) => CellValue::Flag(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(n.to_string())),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Flag(true) => write!(f, "TRUE"),
            CellValue::Flag(false) => write!(f, "FALSE"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Flag(b)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(ts: DateTime<Utc>) -> Self {
        CellValue::Timestamp(ts)
    }
}

/// Parse `YYYY-MM-DD` or `YYYY/MM/DD`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y/%m/%d"))
        .ok()
}

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// One stored row: column name → cell. Missing columns read as empty.
pub type Row = BTreeMap<String, CellValue>;

/// Minimal tabular persistence contract.
///
/// Row positions are 0-based indexes into the sequence returned by
/// `read_all`; rows are never removed, so positions are stable.
pub trait TableStore: Send + Sync {
    /// All rows of a table, in append order.
    fn read_all(&self, table: &str) -> Result<Vec<Row>>;

    /// Append a row at the end of a table.
    fn append_row(&self, table: &str, row: Row) -> Result<()>;

    /// Overwrite one cell of an existing row.
    fn write_cell(&self, table: &str, row_index: usize, column: &str, value: CellValue)
        -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_cells() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::from("  ").is_blank());
        assert!(!CellValue::from("x").is_blank());
        assert!(!CellValue::Flag(false).is_blank());
    }

    #[test]
    fn test_flag_from_text() {
        assert!(CellValue::from("TRUE").as_flag());
        assert!(CellValue::from("true").as_flag());
        assert!(!CellValue::from("FALSE").as_flag());
        assert!(CellValue::Flag(true).as_flag());
        assert!(!CellValue::Empty.as_flag());
    }

    #[test]
    fn test_date_parsing() {
        let expected = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        assert_eq!(CellValue::from("2024-11-03").as_date(), Some(expected));
        assert_eq!(CellValue::from("2024/11/03").as_date(), Some(expected));
        assert_eq!(CellValue::from("Nov 3").as_date(), None);
    }

    #[test]
    fn test_json_conversion() {
        let cell = CellValue::from_json(&serde_json::json!({"order": [1, 2]}));
        assert_eq!(cell, CellValue::Text("{\"order\":[1,2]}".to_string()));
        assert_eq!(CellValue::from_json(&serde_json::Value::Null), CellValue::Empty);
        assert_eq!(CellValue::Empty.to_json(), serde_json::json!(""));
        assert_eq!(CellValue::Flag(true).to_string(), "TRUE");
    }
}
