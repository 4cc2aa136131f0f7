// Relay Roster - Web Server
// Thin JSON adapter over RosterService. Every handler answers 200 with the
// {success, data?, error?} envelope; callers check `success`.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use relay_roster::{
    ApiResponse, Config, ListQuery, PlayerQuery, RecordQuery, RosterService, SqliteStore,
    ALL_TABLES,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    service: Arc<RosterService>,
}

#[derive(Deserialize)]
struct HistoryParams {
    section: Option<String>,
}

#[derive(Deserialize)]
struct DiffParams {
    best: String,
    target: String,
}

#[derive(Deserialize)]
struct SimulationRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    payload: Value,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/players
async fn list_players(
    State(state): State<AppState>,
    Query(query): Query<PlayerQuery>,
) -> impl IntoResponse {
    Json(state.service.list_players(&query))
}

/// POST /api/players
async fn add_player(
    State(state): State<AppState>,
    Json(fields): Json<Map<String, Value>>,
) -> impl IntoResponse {
    Json(state.service.add_player(&fields))
}

/// GET /api/players/:id
async fn player_detail(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    Json(state.service.get_player_detail(&id))
}

/// PUT /api/players/:id
async fn update_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut fields): Json<Map<String, Value>>,
) -> impl IntoResponse {
    fields.insert("id".to_string(), Value::String(id));
    Json(state.service.update_player(&fields))
}

/// DELETE /api/players/:id
async fn delete_player(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    Json(state.service.delete_player(&id))
}

/// GET /api/players/:id/records
async fn player_records(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RecordQuery>,
) -> impl IntoResponse {
    Json(state.service.list_player_records(&id, &query))
}

/// GET /api/players/:id/history
async fn player_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    Json(state.service.record_history(&id, params.section.as_deref()))
}

/// POST /api/records
async fn add_record(
    State(state): State<AppState>,
    Json(fields): Json<Map<String, Value>>,
) -> impl IntoResponse {
    Json(state.service.add_record(&fields))
}

/// GET /api/team-records
async fn list_team_records(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    Json(state.service.list_team_records(&query))
}

/// POST /api/team-records
async fn add_team_record(
    State(state): State<AppState>,
    Json(fields): Json<Map<String, Value>>,
) -> impl IntoResponse {
    Json(state.service.add_team_record(&fields))
}

/// GET /api/simulations
async fn list_simulations(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.list_simulations())
}

/// POST /api/simulations
async fn save_simulation(
    State(state): State<AppState>,
    Json(request): Json<SimulationRequest>,
) -> impl IntoResponse {
    Json(state.service.save_simulation(&request.title, &request.payload))
}

/// POST /api/import - body is raw CSV text
async fn import_players(State(state): State<AppState>, body: String) -> impl IntoResponse {
    Json(state.service.import_players_csv(&body))
}

/// GET /api/target-diff?best=..&target=..
async fn target_diff(
    State(state): State<AppState>,
    Query(params): Query<DiffParams>,
) -> impl IntoResponse {
    Json(state.service.compute_target_diff(&params.best, &params.target))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_roster=info,roster_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = SqliteStore::open(&config.db_path, &ALL_TABLES)?;
    tracing::info!(path = %config.db_path.display(), "database opened");

    let state = AppState {
        service: Arc::new(RosterService::new(Arc::new(store))),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/players", get(list_players).post(add_player))
        .route(
            "/players/:id",
            get(player_detail).put(update_player).delete(delete_player),
        )
        .route("/players/:id/records", get(player_records))
        .route("/players/:id/history", get(player_history))
        .route("/records", axum::routing::post(add_record))
        .route("/team-records", get(list_team_records).post(add_team_record))
        .route("/simulations", get(list_simulations).post(save_simulation))
        .route("/import", axum::routing::post(import_players))
        .route("/target-diff", get(target_diff))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
