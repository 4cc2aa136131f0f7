// Relay Roster - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod time_codec;     // Race time parsing / formatting
pub mod store;          // Tabular store contract + adapters
pub mod schema;         // Per-entity table schemas
pub mod table;          // Generic soft-delete-aware table
pub mod aggregate;      // Best records, target diffs, history
pub mod import;         // CSV bulk import
pub mod service;        // Envelope-returning domain operations
pub mod config;

// Re-export commonly used types
pub use error::{RosterError, RosterResult};
pub use time_codec::{format_seconds, format_time, parse_time};
pub use store::{CellValue, MemoryStore, Row, SqliteStore, TableStore};
pub use schema::{
    FieldDef, FieldKind, SortOrder, TableSchema,
    ALL_TABLES, PLAYERS, RECORDS, SIMULATIONS, TEAM_RECORDS,
};
pub use table::{ListQuery, RecordTable};
pub use aggregate::{
    best_records, record_history, target_diff, target_progress,
    BestRecord, HistoryPoint, TargetDiff, TargetProgress,
    STANDARD_SECTIONS, TARGET_SECTIONS,
};
pub use import::{import_players, parse_csv_line, ImportSummary};
pub use service::{
    ApiResponse, PlayerDetail, PlayerQuery, RecordQuery, RosterService, RowId, SimulationView,
};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
