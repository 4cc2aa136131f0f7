// 🏃 Roster Service - domain operations behind a uniform envelope
//
// Every operation returns ApiResponse { success, data?, error? } and never
// propagates an Err past this layer. Callers check `success`.

use crate::aggregate::{
    best_records, record_history, target_diff, target_progress, BestRecord, HistoryPoint,
    TargetDiff, TargetProgress,
};
use crate::error::{RosterError, RosterResult};
use crate::import::{import_players, ImportSummary};
use crate::schema::{SortOrder, ID_FIELD, PLAYERS, RECORDS, SIMULATIONS, TEAM_RECORDS};
use crate::store::{CellValue, MemoryStore, Row, TableStore};
use crate::table::{ListQuery, RecordTable};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

// ============================================================================
// ENVELOPE
// ============================================================================

/// API Response wrapper
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    fn from_result(operation: &str, result: RosterResult<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                warn!(operation, kind = e.kind(), error = %e, "operation failed");
                Self::err(e.to_string())
            }
        }
    }
}

// ============================================================================
// REQUEST / RESPONSE SHAPES
// ============================================================================

/// Identifier of a created or mutated row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowId {
    pub id: String,
}

/// Player listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlayerQuery {
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
    /// Case-insensitive substring of the player name
    pub search: Option<String>,
    pub affiliation: Option<String>,
    pub category: Option<String>,
}

/// Record listing parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecordQuery {
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerDetail {
    #[serde(flatten)]
    pub player: Map<String, Value>,
    pub best_records: BTreeMap<String, BestRecord>,
    pub target_progress: Vec<TargetProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationView {
    pub id: String,
    pub title: String,
    /// Deserialized payload, or the raw stored text if it is not valid JSON
    pub payload: Value,
    pub created_at: Value,
    pub updated_at: Value,
}

/// Field mapping of a row as JSON.
pub fn row_to_json(row: &Row) -> Map<String, Value> {
    row.iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

/// Caller-supplied JSON fields as a row.
pub fn fields_from_json(fields: &Map<String, Value>) -> Row {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), CellValue::from_json(value)))
        .collect()
}

fn matches_filter(row: &Row, field: &str, wanted: Option<&str>) -> bool {
    match wanted.map(str::trim).filter(|w| !w.is_empty()) {
        Some(w) => row.get(field).is_some_and(|v| v.to_string() == w),
        None => true,
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct RosterService {
    players: RecordTable,
    records: RecordTable,
    team_records: RecordTable,
    simulations: RecordTable,
}

impl RosterService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        RosterService {
            players: RecordTable::new(PLAYERS, Arc::clone(&store)),
            records: RecordTable::new(RECORDS, Arc::clone(&store)),
            team_records: RecordTable::new(TEAM_RECORDS, Arc::clone(&store)),
            simulations: RecordTable::new(SIMULATIONS, store),
        }
    }

    /// Service over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    // ------------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------------

    pub fn list_players(&self, query: &PlayerQuery) -> ApiResponse<Vec<Map<String, Value>>> {
        ApiResponse::from_result("list_players", self.try_list_players(query))
    }

    fn try_list_players(&self, query: &PlayerQuery) -> RosterResult<Vec<Map<String, Value>>> {
        let list_query = ListQuery::new(query.sort_by.clone(), query.order);
        let needle = query
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let rows = self.players.list_where(&list_query, |row| {
            let name_ok = needle.as_deref().map_or(true, |n| {
                row.get("name")
                    .is_some_and(|v| v.to_string().to_lowercase().contains(n))
            });
            name_ok
                && matches_filter(row, "affiliation", query.affiliation.as_deref())
                && matches_filter(row, "category", query.category.as_deref())
        })?;

        Ok(rows.iter().map(row_to_json).collect())
    }

    /// Player fields plus best records and target progress.
    pub fn get_player_detail(&self, id: &str) -> ApiResponse<PlayerDetail> {
        ApiResponse::from_result("get_player_detail", self.try_player_detail(id))
    }

    fn try_player_detail(&self, id: &str) -> RosterResult<PlayerDetail> {
        let player = self.players.get_by_id(id)?;
        let records = self.records_of(id, &ListQuery::default())?;
        let bests = best_records(&records);
        let progress = target_progress(&player, &bests);

        Ok(PlayerDetail {
            player: row_to_json(&player),
            best_records: bests,
            target_progress: progress,
        })
    }

    pub fn add_player(&self, fields: &Map<String, Value>) -> ApiResponse<RowId> {
        let result = self
            .players
            .add(fields_from_json(fields))
            .map(|id| RowId { id });
        ApiResponse::from_result("add_player", result)
    }

    /// `fields` carries the target `id` alongside the changes.
    pub fn update_player(&self, fields: &Map<String, Value>) -> ApiResponse<RowId> {
        ApiResponse::from_result("update_player", self.try_update_player(fields))
    }

    fn try_update_player(&self, fields: &Map<String, Value>) -> RosterResult<RowId> {
        let id = fields
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RosterError::required(ID_FIELD))?
            .to_string();

        self.players.update(&id, fields_from_json(fields))?;
        Ok(RowId { id })
    }

    pub fn delete_player(&self, id: &str) -> ApiResponse<RowId> {
        let result = self.players.soft_delete(id).map(|()| RowId { id: id.to_string() });
        ApiResponse::from_result("delete_player", result)
    }

    // ------------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------------

    pub fn add_record(&self, fields: &Map<String, Value>) -> ApiResponse<RowId> {
        let result = self
            .records
            .add(fields_from_json(fields))
            .map(|id| RowId { id });
        ApiResponse::from_result("add_record", result)
    }

    pub fn list_player_records(
        &self,
        player_id: &str,
        query: &RecordQuery,
    ) -> ApiResponse<Vec<Map<String, Value>>> {
        let list_query = ListQuery::new(query.sort_by.clone(), query.order);
        let result = self.records.list_where(&list_query, |row| {
            is_owned_by(row, player_id) && matches_filter(row, "section", query.section.as_deref())
        });
        ApiResponse::from_result(
            "list_player_records",
            result.map(|rows| rows.iter().map(row_to_json).collect()),
        )
    }

    /// Chronological series of a live player's parseable times.
    pub fn record_history(
        &self,
        player_id: &str,
        section: Option<&str>,
    ) -> ApiResponse<Vec<HistoryPoint>> {
        let result = self.players.get_by_id(player_id).and_then(|_| {
            let records = self.records_of(player_id, &ListQuery::default())?;
            Ok(record_history(&records, section.filter(|s| !s.trim().is_empty())))
        });
        ApiResponse::from_result("record_history", result)
    }

    fn records_of(&self, player_id: &str, query: &ListQuery) -> RosterResult<Vec<Row>> {
        self.records.list_where(query, |row| is_owned_by(row, player_id))
    }

    // ------------------------------------------------------------------------
    // Team records
    // ------------------------------------------------------------------------

    pub fn list_team_records(&self, query: &ListQuery) -> ApiResponse<Vec<Map<String, Value>>> {
        let result = self.team_records.list(query);
        ApiResponse::from_result(
            "list_team_records",
            result.map(|rows| rows.iter().map(row_to_json).collect()),
        )
    }

    pub fn add_team_record(&self, fields: &Map<String, Value>) -> ApiResponse<RowId> {
        let result = self
            .team_records
            .add(fields_from_json(fields))
            .map(|id| RowId { id });
        ApiResponse::from_result("add_team_record", result)
    }

    // ------------------------------------------------------------------------
    // Simulations
    // ------------------------------------------------------------------------

    /// Store a lineup simulation; `payload` is kept as serialized JSON text.
    pub fn save_simulation(&self, title: &str, payload: &Value) -> ApiResponse<RowId> {
        let result = serde_json::to_string(payload)
            .map_err(|e| RosterError::Validation(format!("payload is not serializable: {}", e)))
            .and_then(|text| {
                let mut fields = Row::new();
                fields.insert("title".to_string(), CellValue::from(title));
                if !payload.is_null() {
                    fields.insert("payload".to_string(), CellValue::Text(text));
                }
                self.simulations.add(fields)
            })
            .map(|id| RowId { id });
        ApiResponse::from_result("save_simulation", result)
    }

    pub fn list_simulations(&self) -> ApiResponse<Vec<SimulationView>> {
        let result = self.simulations.list(&ListQuery::default()).map(|rows| {
            rows.iter().map(simulation_view).collect()
        });
        ApiResponse::from_result("list_simulations", result)
    }

    // ------------------------------------------------------------------------
    // Import / calculations
    // ------------------------------------------------------------------------

    pub fn import_players_csv(&self, text: &str) -> ApiResponse<ImportSummary> {
        ApiResponse::from_result("import_players_csv", import_players(&self.players, text))
    }

    pub fn compute_target_diff(&self, best_time: &str, target_time: &str) -> ApiResponse<TargetDiff> {
        ApiResponse::from_result("compute_target_diff", target_diff(best_time, target_time))
    }
}

fn is_owned_by(row: &Row, player_id: &str) -> bool {
    row.get("player_id").is_some_and(|v| v.to_string() == player_id)
}

fn simulation_view(row: &Row) -> SimulationView {
    let id = row.get(ID_FIELD).map(ToString::to_string).unwrap_or_default();
    let raw = row.get("payload").map(ToString::to_string).unwrap_or_default();

    let payload = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(simulation = %id, error = %e, "payload is not valid JSON, returning raw text");
            Value::String(raw)
        }
    };

    SimulationView {
        title: row.get("title").map(ToString::to_string).unwrap_or_default(),
        payload,
        created_at: row.get("created_at").map(CellValue::to_json).unwrap_or(Value::Null),
        updated_at: row.get("updated_at").map(CellValue::to_json).unwrap_or(Value::Null),
        id,
    }
}
