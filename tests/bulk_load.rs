use serde_json::json;

use roombook::api::{self, ApiError};
use roombook::engine::{Engine, EngineConfig, LoadBatch};

fn load_document() -> serde_json::Value {
    json!({
        "rooms": [
            {"id": 100, "name": "Conference Room A", "open_time": "09:00:00", "close_time": "17:00:00", "capacity": 10},
            {"id": 101, "name": "Conference Room B", "open_time": "08:00:00", "close_time": "18:00:00", "capacity": 6}
        ],
        "clients": [
            {"id": 1, "name": "Alice"},
            {"id": 2, "name": "Bob"},
            {"id": 3, "name": "Carol"}
        ],
        "bookings": [
            {"room_id": 100, "client_id": 1, "start_time": "2024-04-01T10:00:00Z", "end_time": "2024-04-01T12:00:00Z"},
            {"room_id": 100, "client_id": 2, "start_time": "2024-04-01T11:00:00Z", "end_time": "2024-04-01T13:00:00Z"},
            {"room_id": 100, "client_id": 1, "start_time": "2024-04-01T12:00:00Z", "end_time": "2024-04-01T14:00:00Z"},
            {"room_id": 101, "client_id": 2, "start_time": "2024-04-01T09:00:00Z", "end_time": "2024-04-01T10:00:00Z"}
        ]
    })
}

async fn loaded_engine() -> Engine {
    let engine = Engine::in_memory(EngineConfig::default());
    let batch: LoadBatch = serde_json::from_value(load_document()).unwrap();
    let summary = engine.load(batch).await.unwrap();
    let response = serde_json::to_value(api::LoadResponse::from(&summary)).unwrap();
    assert_eq!(
        response,
        json!({"detail": "Data loaded successfully", "rooms": 2, "clients": 3, "bookings": 4})
    );
    engine
}

#[tokio::test]
async fn overlap_report_after_load() {
    let engine = loaded_engine().await;
    let overlaps: Vec<api::OverlapDto> = engine.find_overlaps().await.iter().map(Into::into).collect();
    let body = serde_json::to_value(&overlaps).unwrap();
    assert_eq!(
        body,
        json!([
            {
                "room_id": 1,
                "room_name": "Conference Room A",
                "booking1": {"id": 1, "room": 1, "client": 1,
                             "start_time": "2024-04-01T10:00:00Z", "end_time": "2024-04-01T12:00:00Z"},
                "booking2": {"id": 2, "room": 1, "client": 2,
                             "start_time": "2024-04-01T11:00:00Z", "end_time": "2024-04-01T13:00:00Z"}
            },
            {
                "room_id": 1,
                "room_name": "Conference Room A",
                "booking1": {"id": 2, "room": 1, "client": 2,
                             "start_time": "2024-04-01T11:00:00Z", "end_time": "2024-04-01T13:00:00Z"},
                "booking2": {"id": 3, "room": 1, "client": 1,
                             "start_time": "2024-04-01T12:00:00Z", "end_time": "2024-04-01T14:00:00Z"}
            }
        ])
    );
}

#[tokio::test]
async fn usage_and_client_reports_after_load() {
    let engine = loaded_engine().await;

    let usage: Vec<api::UsageDto> = engine.room_usage().await.iter().map(Into::into).collect();
    assert_eq!(
        serde_json::to_value(&usage).unwrap(),
        json!([
            {"room_id": 1, "room_name": "Conference Room A", "usage_percentage": 30},
            {"room_id": 2, "room_name": "Conference Room B", "usage_percentage": 10}
        ])
    );

    let report: Vec<api::ClientReportDto> = engine
        .booking_counts_by_client()
        .await
        .iter()
        .map(Into::into)
        .collect();
    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        json!([
            {"id": 1, "name": "Alice", "booking_count": 2},
            {"id": 2, "name": "Bob", "booking_count": 2},
            {"id": 3, "name": "Carol", "booking_count": 0}
        ])
    );
}

#[tokio::test]
async fn availability_queries_after_load() {
    let engine = loaded_engine().await;

    let busy = api::availability_query(&engine, 1, Some("2024-04-01T12:00:00Z"))
        .await
        .unwrap();
    assert!(!busy.available);
    let free = api::availability_query(&engine, 2, Some("2024-04-01T10:00:01Z"))
        .await
        .unwrap();
    assert!(free.available);
    assert_eq!(free.room_name, "Conference Room B");
}

#[tokio::test]
async fn unknown_reference_reports_caller_id() {
    let engine = Engine::in_memory(EngineConfig::default());
    let batch: LoadBatch = serde_json::from_value(json!({
        "rooms": [{"id": 100, "name": "A", "open_time": "09:00:00", "close_time": "17:00:00", "capacity": 1}],
        "clients": [{"id": 1, "name": "Alice"}],
        "bookings": [{"room_id": 999, "client_id": 1,
                      "start_time": "2024-04-01T10:00:00Z", "end_time": "2024-04-01T11:00:00Z"}]
    }))
    .unwrap();

    let err = ApiError::from(engine.load(batch).await.unwrap_err());
    assert_eq!(err.status, 400);
    assert_eq!(err.detail, "Room id 999 not found");
    // Non-transactional: the room and client stay.
    assert_eq!(engine.list_rooms().await.len(), 1);
    assert_eq!(engine.list_clients().await.len(), 1);
}

#[tokio::test]
async fn empty_document_loads_nothing() {
    let engine = Engine::in_memory(EngineConfig::default());
    let batch: LoadBatch = serde_json::from_value(json!({})).unwrap();
    assert!(batch.is_empty());
    let summary = engine.load(batch).await.unwrap();
    assert!(summary.rooms.is_empty() && summary.bookings.is_empty());
}
