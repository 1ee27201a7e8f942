//! JSON shapes and status codes of the outer surface.
//!
//! Everything here converts between wire text (RFC 3339 instants, `HH:MM:SS`
//! times, string ids) and engine types; no booking logic lives in this module.

use serde::{Deserialize, Serialize};

use crate::engine::{Engine, EngineError, LoadSummary, NewBooking, NewClient, NewRoom};
use crate::model::*;
pub use crate::timefmt::{format_instant, format_time_of_day, parse_instant, parse_time_of_day};

// ── Response bodies ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDto {
    pub id: RoomId,
    pub name: String,
    pub open_time: String,
    pub close_time: String,
    pub capacity: u32,
}

impl From<&Room> for RoomDto {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id,
            name: room.name.clone(),
            open_time: format_time_of_day(room.open_time),
            close_time: format_time_of_day(room.close_time),
            capacity: room.capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDto {
    pub id: ClientId,
    pub name: String,
}

impl From<&Client> for ClientDto {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id,
            name: client.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDto {
    pub id: BookingId,
    pub room: RoomId,
    pub client: ClientId,
    pub start_time: String,
    pub end_time: String,
}

impl From<&Booking> for BookingDto {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id,
            room: b.room_id,
            client: b.client_id,
            start_time: format_instant(b.span.start),
            end_time: format_instant(b.span.end),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityDto {
    pub room_id: RoomId,
    pub room_name: String,
    pub available: bool,
}

impl From<Availability> for AvailabilityDto {
    fn from(a: Availability) -> Self {
        Self {
            room_id: a.room_id,
            room_name: a.room_name,
            available: a.available,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapDto {
    pub room_id: RoomId,
    pub room_name: String,
    pub booking1: BookingDto,
    pub booking2: BookingDto,
}

impl From<&OverlapPair> for OverlapDto {
    fn from(p: &OverlapPair) -> Self {
        Self {
            room_id: p.room_id,
            room_name: p.room_name.clone(),
            booking1: BookingDto::from(&p.first),
            booking2: BookingDto::from(&p.second),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDto {
    pub room_id: RoomId,
    pub room_name: String,
    pub usage_percentage: u8,
}

impl From<&RoomUsage> for UsageDto {
    fn from(u: &RoomUsage) -> Self {
        Self {
            room_id: u.room_id,
            room_name: u.room_name.clone(),
            usage_percentage: u.usage_percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientReportDto {
    pub id: ClientId,
    pub name: String,
    pub booking_count: usize,
}

impl From<&ClientBookingCount> for ClientReportDto {
    fn from(c: &ClientBookingCount) -> Self {
        Self {
            id: c.client_id,
            name: c.client_name.clone(),
            booking_count: c.booking_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyDto {
    pub room_id: RoomId,
    pub room_name: String,
    pub date: String,
    pub open_minutes: i64,
    pub booked_minutes: i64,
    pub occupancy_percentage: u8,
}

impl From<&Occupancy> for OccupancyDto {
    fn from(o: &Occupancy) -> Self {
        Self {
            room_id: o.room_id,
            room_name: o.room_name.clone(),
            date: o.date.format("%Y-%m-%d").to_string(),
            open_minutes: o.open_ms / 60_000,
            booked_minutes: o.booked_ms / 60_000,
            occupancy_percentage: o.percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResponse {
    pub detail: String,
    pub rooms: usize,
    pub clients: usize,
    pub bookings: usize,
}

impl From<&LoadSummary> for LoadResponse {
    fn from(s: &LoadSummary) -> Self {
        Self {
            detail: "Data loaded successfully".into(),
            rooms: s.rooms.len(),
            clients: s.clients.len(),
            bookings: s.bookings.len(),
        }
    }
}

// ── Request bodies ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub open_time: String,
    pub close_time: String,
    pub capacity: u32,
}

impl TryFrom<&CreateRoomRequest> for NewRoom {
    type Error = EngineError;

    fn try_from(req: &CreateRoomRequest) -> Result<Self, Self::Error> {
        Ok(NewRoom {
            name: req.name.clone(),
            open_time: parse_time_of_day("open_time", &req.open_time)?,
            close_time: parse_time_of_day("close_time", &req.close_time)?,
            capacity: req.capacity,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
}

impl From<&CreateClientRequest> for NewClient {
    fn from(req: &CreateClientRequest) -> Self {
        NewClient {
            name: req.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub room: RoomId,
    pub client: ClientId,
    pub start_time: String,
    pub end_time: String,
}

impl TryFrom<&CreateBookingRequest> for NewBooking {
    type Error = EngineError;

    fn try_from(req: &CreateBookingRequest) -> Result<Self, Self::Error> {
        Ok(NewBooking {
            room_id: req.room,
            client_id: req.client,
            start: parse_instant("start_time", &req.start_time)?,
            end: parse_instant("end_time", &req.end_time)?,
        })
    }
}

// ── Errors ───────────────────────────────────────────────────────

/// An `EngineError` as the outer surface reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: u16,
    pub code: &'static str,
    pub detail: String,
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let (status, code) = match &e {
            EngineError::Validation { .. } => (400, "validation_error"),
            EngineError::ReferenceNotFound { .. } => (400, "reference_not_found"),
            EngineError::MissingParameter(_) => (400, "missing_parameter"),
            EngineError::InvalidFormat { .. } => (400, "invalid_format"),
            EngineError::LimitExceeded(_) => (400, "limit_exceeded"),
            EngineError::NotFound { .. } => (404, "not_found"),
            EngineError::Conflict { .. } => (409, "conflict"),
            EngineError::WalError(_) => (500, "internal_error"),
        };
        Self {
            status,
            code,
            detail: e.to_string(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.detail)
    }
}

impl std::error::Error for ApiError {}

// ── Query endpoints that take raw parameters ─────────────────────

/// Availability of `room_id` at the instant given as text. The room is looked up
/// before the parameter is checked, so an unknown room reports 404 even when
/// `time` is missing.
pub async fn availability_query(
    engine: &Engine,
    room_id: RoomId,
    time: Option<&str>,
) -> Result<AvailabilityDto, ApiError> {
    engine.get_room(room_id).await?;
    let time = time
        .filter(|t| !t.is_empty())
        .ok_or(EngineError::MissingParameter("time"))?;
    let instant = parse_instant("time", time)?;
    Ok(engine.is_available(room_id, instant).await?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;

    async fn engine_with_room() -> (Engine, RoomId, ClientId) {
        let engine = Engine::in_memory(EngineConfig::default());
        let req = CreateRoomRequest {
            name: "Conference Room A".into(),
            open_time: "09:00:00".into(),
            close_time: "17:00:00".into(),
            capacity: 10,
        };
        let room = engine
            .create_room(NewRoom::try_from(&req).unwrap())
            .await
            .unwrap();
        let client = engine
            .create_client(NewClient::from(&CreateClientRequest { name: "Alice".into() }))
            .await
            .unwrap();
        (engine, room.id, client.id)
    }

    #[tokio::test]
    async fn booking_serializes_with_wire_field_names() {
        let (engine, room, client) = engine_with_room().await;
        let req = CreateBookingRequest {
            room,
            client,
            start_time: "2024-04-01T10:00:00Z".into(),
            end_time: "2024-04-01T11:00:00Z".into(),
        };
        let booking = engine
            .create_booking(NewBooking::try_from(&req).unwrap())
            .await
            .unwrap();
        let json = serde_json::to_value(BookingDto::from(&booking)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "room": 1,
                "client": 1,
                "start_time": "2024-04-01T10:00:00Z",
                "end_time": "2024-04-01T11:00:00Z",
            })
        );
    }

    #[tokio::test]
    async fn room_times_render_with_seconds() {
        let (engine, room, _) = engine_with_room().await;
        let dto = RoomDto::from(&engine.get_room(room).await.unwrap());
        assert_eq!(dto.open_time, "09:00:00");
        assert_eq!(dto.close_time, "17:00:00");
    }

    #[tokio::test]
    async fn availability_missing_time_is_400() {
        let (engine, room, _) = engine_with_room().await;
        let err = availability_query(&engine, room, None).await.unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.code, "missing_parameter");

        let err = availability_query(&engine, room, Some("")).await.unwrap_err();
        assert_eq!(err.code, "missing_parameter");
    }

    #[tokio::test]
    async fn availability_blank_time_is_invalid_format() {
        let (engine, room, _) = engine_with_room().await;
        let err = availability_query(&engine, room, Some("  ")).await.unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.code, "invalid_format");
    }

    #[tokio::test]
    async fn availability_bad_time_is_400() {
        let (engine, room, _) = engine_with_room().await;
        let err = availability_query(&engine, room, Some("noon")).await.unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.code, "invalid_format");
    }

    #[tokio::test]
    async fn availability_unknown_room_is_404_before_param_check() {
        let (engine, _, _) = engine_with_room().await;
        let err = availability_query(&engine, 999, None).await.unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[tokio::test]
    async fn availability_accepts_offset_without_seconds() {
        let (engine, room, _) = engine_with_room().await;
        let dto = availability_query(&engine, room, Some("2024-04-01T12:00+0200"))
            .await
            .unwrap();
        assert!(dto.available);
    }

    #[tokio::test]
    async fn availability_ok() {
        let (engine, room, _) = engine_with_room().await;
        let dto = availability_query(&engine, room, Some("2024-04-01T10:00:00Z"))
            .await
            .unwrap();
        assert_eq!(
            dto,
            AvailabilityDto {
                room_id: room,
                room_name: "Conference Room A".into(),
                available: true,
            }
        );
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (EngineError::validation("name", "blank"), 400),
            (
                EngineError::ReferenceNotFound {
                    entity: crate::engine::EntityKind::Room,
                    id: ExternalId::Number(999),
                },
                400,
            ),
            (
                EngineError::NotFound {
                    entity: crate::engine::EntityKind::Booking,
                    id: 3,
                },
                404,
            ),
            (EngineError::Conflict { existing: 1 }, 409),
            (EngineError::WalError("disk".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn reference_not_found_detail_names_the_external_id() {
        let err = ApiError::from(EngineError::ReferenceNotFound {
            entity: crate::engine::EntityKind::Client,
            id: ExternalId::Text("c-7".into()),
        });
        assert_eq!(err.detail, "Client id c-7 not found");
        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"code": "reference_not_found", "detail": "Client id c-7 not found"})
        );
    }
}
