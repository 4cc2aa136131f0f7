// End-to-end roster flows through the public service API.

use relay_roster::{
    ListQuery, MemoryStore, PlayerQuery, RecordQuery, RosterService, SortOrder, SqliteStore,
    ALL_TABLES,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

fn names(players: &[Map<String, Value>]) -> Vec<String> {
    players
        .iter()
        .map(|p| p["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_import_then_query_roster() {
    let service = RosterService::new(Arc::new(MemoryStore::new()));

    let summary = service
        .import_players_csv("name,registration_number\nAlice,001\n,002\nBob,001")
        .data
        .unwrap();
    assert_eq!(summary.imported, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.errors.len(), 2);
    assert!(summary.errors[0].starts_with("row 3:"));
    assert!(summary.errors[1].starts_with("row 4:"));

    let players = service.list_players(&PlayerQuery::default()).data.unwrap();
    assert_eq!(names(&players), vec!["Alice"]);
}

#[test]
fn test_import_with_bad_header_is_batch_failure() {
    let service = RosterService::in_memory();
    let response = service.import_players_csv("name,number\nAlice,001");
    assert!(!response.success);
    assert!(response.data.is_none());
}

#[test]
fn test_soft_delete_frees_registration_number() {
    let service = RosterService::in_memory();
    let first = service
        .add_player(&obj(json!({"name": "Alice", "registration_number": "001"})))
        .data
        .unwrap()
        .id;

    let conflict = service.add_player(&obj(json!({"name": "Bob", "registration_number": "001"})));
    assert!(!conflict.success);
    assert_eq!(
        conflict.error.as_deref(),
        Some("registration_number 001 is already registered")
    );

    assert!(service.delete_player(&first).success);
    assert!(!service.get_player_detail(&first).success);
    assert!(service
        .list_players(&PlayerQuery::default())
        .data
        .unwrap()
        .is_empty());

    let reuse = service.add_player(&obj(json!({"name": "Bob", "registration_number": "001"})));
    assert!(reuse.success);
}

#[test]
fn test_sort_players_by_name_ignores_case() {
    let service = RosterService::in_memory();
    for (name, reg) in [("bob", "001"), ("Carol", "002"), ("alice", "003")] {
        assert!(service
            .add_player(&obj(json!({"name": name, "registration_number": reg})))
            .success);
    }

    let query = PlayerQuery {
        sort_by: Some("name".to_string()),
        order: Some(SortOrder::Desc),
        ..PlayerQuery::default()
    };
    let players = service.list_players(&query).data.unwrap();
    assert_eq!(names(&players), vec!["Carol", "bob", "alice"]);
}

#[test]
fn test_records_history_and_bests_over_sqlite() {
    let store = SqliteStore::open_in_memory(&ALL_TABLES).unwrap();
    let service = RosterService::new(Arc::new(store));

    let id = service
        .add_player(&obj(json!({
            "name": "Aoki", "registration_number": "010", "target_10000m": "30:00",
        })))
        .data
        .unwrap()
        .id;

    for (race, date, section, time) in [
        ("Spring Trial", "2024-04-14", "10000m", "31:20"),
        ("Summer Meet", "2024-07-02", "10000m", "30:45"),
        ("Autumn Relay", "2024-10-20", "10000m", "29:58"),
        ("Track Night", "2024-06-01", "5000m", "14:59"),
    ] {
        let response = service.add_record(&obj(json!({
            "player_id": id, "race_name": race, "date": date,
            "section": section, "time": time,
        })));
        assert!(response.success, "{:?}", response.error);
    }

    // Default order: newest first
    let records = service
        .list_player_records(&id, &RecordQuery::default())
        .data
        .unwrap();
    assert_eq!(records[0]["race_name"], json!("Autumn Relay"));
    assert_eq!(records[0]["date"], json!("2024-10-20"));

    let filtered = service
        .list_player_records(
            &id,
            &RecordQuery {
                section: Some("5000m".to_string()),
                ..RecordQuery::default()
            },
        )
        .data
        .unwrap();
    assert_eq!(filtered.len(), 1);

    let history = service.record_history(&id, Some("10000m")).data.unwrap();
    let seconds: Vec<i64> = history.iter().map(|p| p.seconds).collect();
    assert_eq!(seconds, vec![1880, 1845, 1798]);
    assert_eq!(history[0].label, "2024-04-14");

    let detail = service.get_player_detail(&id).data.unwrap();
    assert_eq!(detail.best_records["10000m"].time, "29:58");
    assert_eq!(detail.best_records["5000m"].seconds, 899);
    assert!(detail.target_progress[0].diff.achieved);
    assert_eq!(detail.target_progress[0].diff.formatted, "+0:02");
}

#[test]
fn test_team_records_and_simulations() {
    let service = RosterService::in_memory();

    for (race, date) in [("City Ekiden", "2023-11-05"), ("Prefectural Ekiden", "2024-11-03")] {
        let response = service.add_team_record(&obj(json!({
            "race_name": race, "date": date, "total_time": "2:10:33", "rank": 4,
        })));
        assert!(response.success);
    }
    assert!(!service.add_team_record(&obj(json!({"date": "2024-01-01"}))).success);

    let teams = service.list_team_records(&ListQuery::default()).data.unwrap();
    assert_eq!(teams[0]["race_name"], json!("Prefectural Ekiden"));
    assert_eq!(teams[0]["rank"], json!(4.0));

    let ascending = service
        .list_team_records(&ListQuery::sorted("date", SortOrder::Asc))
        .data
        .unwrap();
    assert_eq!(ascending[0]["race_name"], json!("City Ekiden"));

    let lineup = json!({"order": ["p1", "p2", "p3"]});
    assert!(service.save_simulation("Lineup A", &lineup).success);
    let sims = service.list_simulations().data.unwrap();
    assert_eq!(sims[0].payload, lineup);
}

#[test]
fn test_target_diff_both_directions() {
    let service = RosterService::in_memory();

    let slower = service.compute_target_diff("15:30", "15:00").data.unwrap();
    assert!(!slower.achieved);
    assert_eq!(slower.diff_seconds, 30);
    assert_eq!(slower.formatted, "-0:30");

    let faster = service.compute_target_diff("14:50", "15:00").data.unwrap();
    assert!(faster.achieved);
    assert_eq!(faster.diff_seconds, -10);
}
