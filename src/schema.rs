// 📐 Shape Layer - per-entity table schemas
//
// Each entity kind is described by a TableSchema value handed to the
// generic RecordTable. No process-wide mutable schema state.

use crate::error::{RosterError, RosterResult};
use crate::store::{parse_date, CellValue, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FIELD TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text (names, times, labels)
    Text,
    /// Calendar date; text is coerced on write when it parses
    Date,
    /// System-managed instant (created_at / updated_at)
    Timestamp,
    /// Boolean flag (soft delete)
    Flag,
    /// Structured data serialized to text
    Payload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str) -> FieldDef {
    FieldDef { name, kind: FieldKind::Text }
}

const fn date(name: &'static str) -> FieldDef {
    FieldDef { name, kind: FieldKind::Date }
}

const fn timestamp(name: &'static str) -> FieldDef {
    FieldDef { name, kind: FieldKind::Timestamp }
}

const fn flag(name: &'static str) -> FieldDef {
    FieldDef { name, kind: FieldKind::Flag }
}

const fn payload(name: &'static str) -> FieldDef {
    FieldDef { name, kind: FieldKind::Payload }
}

// ============================================================================
// SORT ORDER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(RosterError::Validation(format!(
                "order must be asc or desc, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TABLE SCHEMA
// ============================================================================

pub const ID_FIELD: &str = "id";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";
pub const IS_DELETED: &str = "is_deleted";

/// Shape and policy of one entity table.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    /// Entity name used in error messages ("Player")
    pub entity: &'static str,
    /// Physical table name in the store ("Players")
    pub table: &'static str,
    /// Column order as stored
    pub fields: &'static [FieldDef],
    /// Fields that must be present and non-blank on insert
    pub required: &'static [&'static str],
    /// Fields the generic update path may change
    pub patchable: &'static [&'static str],
    pub default_sort: &'static str,
    pub default_order: SortOrder,
    /// Flag column marking soft-deleted rows, if the entity supports it
    pub soft_delete: Option<&'static str>,
    /// Field unique among live rows, if any
    pub unique: Option<&'static str>,
}

const PLAYER_PATCHABLE: &[&str] = &[
    "registration_number",
    "name",
    "affiliation",
    "category",
    "target_1500m",
    "target_3000m",
    "target_5000m",
    "target_10000m",
    "target_half",
    "target_full",
    "comment",
];

pub const PLAYERS: TableSchema = TableSchema {
    entity: "Player",
    table: "Players",
    fields: &[
        text(ID_FIELD),
        text("registration_number"),
        text("name"),
        text("affiliation"),
        text("category"),
        text("target_1500m"),
        text("target_3000m"),
        text("target_5000m"),
        text("target_10000m"),
        text("target_half"),
        text("target_full"),
        text("comment"),
        flag(IS_DELETED),
        timestamp(CREATED_AT),
        timestamp(UPDATED_AT),
    ],
    required: &["name", "registration_number"],
    patchable: PLAYER_PATCHABLE,
    default_sort: "registration_number",
    default_order: SortOrder::Asc,
    soft_delete: Some(IS_DELETED),
    unique: Some("registration_number"),
};

pub const RECORDS: TableSchema = TableSchema {
    entity: "Record",
    table: "Records",
    fields: &[
        text(ID_FIELD),
        text("player_id"),
        text("race_name"),
        date("date"),
        text("section"),
        text("time"),
        text("memo"),
        timestamp(CREATED_AT),
        timestamp(UPDATED_AT),
    ],
    required: &["player_id", "race_name", "section", "time"],
    patchable: &["player_id", "race_name", "date", "section", "time", "memo"],
    default_sort: "date",
    default_order: SortOrder::Desc,
    soft_delete: None,
    unique: None,
};

pub const TEAM_RECORDS: TableSchema = TableSchema {
    entity: "TeamRecord",
    table: "TeamRecords",
    fields: &[
        text(ID_FIELD),
        text("race_name"),
        date("date"),
        text("total_time"),
        text("rank"),
        text("memo"),
        timestamp(CREATED_AT),
        timestamp(UPDATED_AT),
    ],
    required: &["race_name"],
    patchable: &["race_name", "date", "total_time", "rank", "memo"],
    default_sort: "date",
    default_order: SortOrder::Desc,
    soft_delete: None,
    unique: None,
};

pub const SIMULATIONS: TableSchema = TableSchema {
    entity: "Simulation",
    table: "Simulations",
    fields: &[
        text(ID_FIELD),
        text("title"),
        timestamp(CREATED_AT),
        payload("payload"),
        timestamp(UPDATED_AT),
    ],
    required: &["title", "payload"],
    patchable: &["title", "payload"],
    default_sort: CREATED_AT,
    default_order: SortOrder::Desc,
    soft_delete: None,
    unique: None,
};

/// Every schema the roster stores.
pub const ALL_TABLES: [TableSchema; 4] = [PLAYERS, RECORDS, TEAM_RECORDS, SIMULATIONS];

impl TableSchema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Fields managed by the table itself and never taken from callers.
    pub fn is_system_field(&self, name: &str) -> bool {
        name == ID_FIELD
            || name == CREATED_AT
            || name == UPDATED_AT
            || self.soft_delete == Some(name)
    }

    /// Fields a caller may supply on insert.
    pub fn is_insertable(&self, name: &str) -> bool {
        self.has_field(name) && !self.is_system_field(name)
    }

    pub fn is_patchable(&self, name: &str) -> bool {
        self.patchable.contains(&name)
    }

    /// First required field that is missing or blank, in declaration order.
    pub fn validate_required(&self, fields: &Row) -> RosterResult<()> {
        for name in self.required {
            let present = fields.get(*name).is_some_and(|v| !v.is_blank());
            if !present {
                return Err(RosterError::required(name));
            }
        }
        Ok(())
    }

    /// Normalize a caller-supplied value for storage in `name`.
    ///
    /// Text is trimmed. Date fields turn parseable text into typed dates;
    /// anything else is kept as given.
    pub fn coerce(&self, name: &str, value: CellValue) -> CellValue {
        let kind = self.field(name).map(|f| f.kind);
        match (kind, value) {
            (Some(FieldKind::Date), CellValue::Text(s)) => match parse_date(&s) {
                Some(d) => CellValue::Date(d),
                None => CellValue::Text(s.trim().to_string()),
            },
            (Some(FieldKind::Payload), v) => v,
            (_, CellValue::Text(s)) => CellValue::Text(s.trim().to_string()),
            (_, v) => v,
        }
    }
}
