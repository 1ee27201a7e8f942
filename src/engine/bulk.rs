use std::collections::HashMap;
use std::time::Instant;

use serde::Deserialize;
use tracing::{info, warn};

use crate::limits::MAX_BATCH_ITEMS;
use crate::model::*;
use crate::observability;
use crate::timefmt::{parse_instant, parse_time_of_day};

use super::mutations::{NewBooking, NewClient, NewRoom};
use super::{Engine, EngineError, EntityKind};

/// One bulk-load document. Rooms and clients carry caller-side ids that the
/// bookings refer to; the engine assigns its own ids on insert.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadBatch {
    #[serde(default)]
    pub rooms: Vec<RoomPayload>,
    #[serde(default)]
    pub clients: Vec<ClientPayload>,
    #[serde(default)]
    pub bookings: Vec<BookingPayload>,
}

impl LoadBatch {
    pub fn len(&self) -> usize {
        self.rooms.len() + self.clients.len() + self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomPayload {
    pub id: Option<ExternalId>,
    pub name: Option<String>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    /// Number or numeric string.
    pub capacity: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientPayload {
    pub id: Option<ExternalId>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingPayload {
    pub room_id: Option<ExternalId>,
    pub client_id: Option<ExternalId>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// What a successful load created, in payload order.
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub rooms: Vec<Room>,
    pub clients: Vec<Client>,
    pub bookings: Vec<Booking>,
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, EngineError> {
    value.as_deref().ok_or(EngineError::missing(field))
}

fn parse_capacity(value: &Option<serde_json::Value>) -> Result<u32, EngineError> {
    let value = value.as_ref().ok_or(EngineError::missing("capacity"))?;
    let n = match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let n = n.ok_or_else(|| EngineError::InvalidFormat {
        field: "capacity",
        value: value.to_string(),
    })?;
    if n <= 0 {
        return Err(EngineError::validation(
            "capacity",
            "capacity must be a positive integer",
        ));
    }
    u32::try_from(n).map_err(|_| EngineError::validation("capacity", "capacity is too large"))
}

impl RoomPayload {
    pub fn to_new_room(&self) -> Result<NewRoom, EngineError> {
        let name = required("name", &self.name)?;
        let open_time = parse_time_of_day("open_time", required("open_time", &self.open_time)?)?;
        let close_time = parse_time_of_day("close_time", required("close_time", &self.close_time)?)?;
        Ok(NewRoom {
            name: name.to_string(),
            open_time,
            close_time,
            capacity: parse_capacity(&self.capacity)?,
        })
    }
}

impl ClientPayload {
    pub fn to_new_client(&self) -> Result<NewClient, EngineError> {
        Ok(NewClient {
            name: required("name", &self.name)?.to_string(),
        })
    }
}

fn resolve(
    entity: EntityKind,
    field: &'static str,
    key: &Option<ExternalId>,
    map: &HashMap<ExternalId, u64>,
) -> Result<u64, EngineError> {
    let key = key.as_ref().ok_or(EngineError::missing(field))?;
    map.get(key)
        .copied()
        .ok_or_else(|| EngineError::ReferenceNotFound {
            entity,
            id: key.clone(),
        })
}

impl Engine {
    /// Load rooms, then clients, then bookings, remapping caller ids to engine ids.
    ///
    /// Stops at the first bad item. Items created before it stay created.
    /// Holds the batch gate exclusively, so no other operation interleaves.
    pub async fn load(&self, batch: LoadBatch) -> Result<LoadSummary, EngineError> {
        let started = Instant::now();
        if batch.len() > MAX_BATCH_ITEMS {
            return Err(EngineError::LimitExceeded("too many items in batch"));
        }
        let _gate = self.batch_gate.write().await;
        info!(
            rooms = batch.rooms.len(),
            clients = batch.clients.len(),
            bookings = batch.bookings.len(),
            "bulk load started"
        );
        let result = self.load_locked(&batch).await;
        metrics::counter!(observability::BULK_LOADS_TOTAL, "status" => observability::status_label(&result))
            .increment(1);
        observability::record_operation("load", started, &result);
        match &result {
            Ok(summary) => info!(
                rooms = summary.rooms.len(),
                clients = summary.clients.len(),
                bookings = summary.bookings.len(),
                "bulk load finished"
            ),
            Err(e) => warn!("bulk load aborted: {e}"),
        }
        result
    }

    async fn load_locked(&self, batch: &LoadBatch) -> Result<LoadSummary, EngineError> {
        let mut summary = LoadSummary::default();

        let mut room_ids: HashMap<ExternalId, RoomId> = HashMap::new();
        for payload in &batch.rooms {
            let room = self.create_room_locked(payload.to_new_room()?).await?;
            let key = payload.id.clone().unwrap_or(ExternalId::Number(room.id));
            room_ids.insert(key, room.id);
            summary.rooms.push(room);
        }

        let mut client_ids: HashMap<ExternalId, ClientId> = HashMap::new();
        for payload in &batch.clients {
            let client = self.create_client_locked(payload.to_new_client()?).await?;
            let key = payload.id.clone().unwrap_or(ExternalId::Number(client.id));
            client_ids.insert(key, client.id);
            summary.clients.push(client);
        }

        for payload in &batch.bookings {
            let room_id = resolve(EntityKind::Room, "room_id", &payload.room_id, &room_ids)?;
            let client_id = resolve(EntityKind::Client, "client_id", &payload.client_id, &client_ids)?;
            let start = parse_instant("start_time", required("start_time", &payload.start_time)?)?;
            let end = parse_instant("end_time", required("end_time", &payload.end_time)?)?;
            let booking = self
                .create_booking_locked(NewBooking {
                    room_id,
                    client_id,
                    start,
                    end,
                })
                .await?;
            summary.bookings.push(booking);
        }

        Ok(summary)
    }
}
