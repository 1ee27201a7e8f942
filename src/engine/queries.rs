use std::time::Instant;

use chrono::NaiveDate;

use crate::model::*;
use crate::observability;

use super::availability::{is_free_at, occupancy};
use super::conflict::overlap_pairs;
use super::reports::usage_percentage;
use super::{Engine, EngineError, EntityKind, SharedRoomState};

impl Engine {
    fn room_state(&self, id: RoomId) -> Result<SharedRoomState, EngineError> {
        self.store.get_room_state(&id).ok_or(EngineError::NotFound {
            entity: EntityKind::Room,
            id,
        })
    }

    pub async fn get_room(&self, id: RoomId) -> Result<Room, EngineError> {
        let _gate = self.batch_gate.read().await;
        let rs = self.room_state(id)?;
        let guard = rs.read().await;
        Ok(guard.room.clone())
    }

    pub async fn get_client(&self, id: ClientId) -> Result<Client, EngineError> {
        let _gate = self.batch_gate.read().await;
        self.store.get_client(&id).ok_or(EngineError::NotFound {
            entity: EntityKind::Client,
            id,
        })
    }

    pub async fn get_booking(&self, id: BookingId) -> Result<Booking, EngineError> {
        let _gate = self.batch_gate.read().await;
        self.store
            .get_booking(&id)
            .await
            .ok_or(EngineError::NotFound {
                entity: EntityKind::Booking,
                id,
            })
    }

    /// All rooms, ascending by id.
    pub async fn list_rooms(&self) -> Vec<Room> {
        let _gate = self.batch_gate.read().await;
        let mut rooms = Vec::with_capacity(self.store.room_count());
        for id in self.store.room_ids() {
            if let Some(rs) = self.store.get_room_state(&id) {
                rooms.push(rs.read().await.room.clone());
            }
        }
        rooms
    }

    /// All clients, ascending by id.
    pub async fn list_clients(&self) -> Vec<Client> {
        let _gate = self.batch_gate.read().await;
        self.store.clients()
    }

    /// Every booking ascending by id, or only those of `client_id`.
    /// An unknown client simply has no bookings.
    pub async fn list_bookings(&self, client_id: Option<ClientId>) -> Vec<Booking> {
        let _gate = self.batch_gate.read().await;
        if let Some(client_id) = client_id {
            return self.store.list_by_client(&client_id).await;
        }
        let mut all = Vec::with_capacity(self.store.booking_count());
        for id in self.store.room_ids() {
            if let Some(bookings) = self.store.list_by_room(&id).await {
                all.extend(bookings);
            }
        }
        all.sort_unstable_by_key(|b| b.id);
        all
    }

    /// Bookings of one room by start time.
    pub async fn room_bookings(&self, room_id: RoomId) -> Result<Vec<Booking>, EngineError> {
        let _gate = self.batch_gate.read().await;
        self.store
            .list_by_room(&room_id)
            .await
            .ok_or(EngineError::NotFound {
                entity: EntityKind::Room,
                id: room_id,
            })
    }

    /// Is the room free at `instant`? A booking's start and end both count as occupied.
    pub async fn is_available(&self, room_id: RoomId, instant: Ms) -> Result<Availability, EngineError> {
        let started = Instant::now();
        let _gate = self.batch_gate.read().await;
        let result = match self.room_state(room_id) {
            Ok(rs) => {
                let guard = rs.read().await;
                Ok(Availability {
                    room_id,
                    room_name: guard.room.name.clone(),
                    available: is_free_at(&guard, instant),
                })
            }
            Err(e) => Err(e),
        };
        observability::record_operation("is_available", started, &result);
        result
    }

    /// Every pair of overlapping bookings, rooms by id, then by index in the
    /// room's start-ordered booking list.
    pub async fn find_overlaps(&self) -> Vec<OverlapPair> {
        let started = Instant::now();
        let _gate = self.batch_gate.read().await;
        let mut overlaps = Vec::new();
        for room_id in self.store.room_ids() {
            let Some(rs) = self.store.get_room_state(&room_id) else {
                continue;
            };
            let guard = rs.read().await;
            for (i, j) in overlap_pairs(&guard.bookings) {
                overlaps.push(OverlapPair {
                    room_id,
                    room_name: guard.room.name.clone(),
                    first: guard.bookings[i].clone(),
                    second: guard.bookings[j].clone(),
                });
            }
        }
        metrics::gauge!(observability::OVERLAPS_REPORTED).set(overlaps.len() as f64);
        observability::record_operation::<_, EngineError>("find_overlaps", started, &Ok(()));
        overlaps
    }

    pub async fn room_usage(&self) -> Vec<RoomUsage> {
        let _gate = self.batch_gate.read().await;
        let mut usage = Vec::with_capacity(self.store.room_count());
        for room_id in self.store.room_ids() {
            let Some(rs) = self.store.get_room_state(&room_id) else {
                continue;
            };
            let guard = rs.read().await;
            usage.push(RoomUsage {
                room_id,
                room_name: guard.room.name.clone(),
                usage_percentage: usage_percentage(guard.bookings.len()),
            });
        }
        usage
    }

    /// Booking count per client, including clients without bookings, ascending by id.
    pub async fn booking_counts_by_client(&self) -> Vec<ClientBookingCount> {
        let _gate = self.batch_gate.read().await;
        self.store
            .clients()
            .into_iter()
            .map(|c| ClientBookingCount {
                booking_count: self.store.client_booking_count(&c.id),
                client_id: c.id,
                client_name: c.name,
            })
            .collect()
    }

    /// Share of the room's operating hours on `date` (UTC) covered by bookings.
    pub async fn room_occupancy(&self, room_id: RoomId, date: NaiveDate) -> Result<Occupancy, EngineError> {
        let _gate = self.batch_gate.read().await;
        let rs = self.room_state(room_id)?;
        let guard = rs.read().await;
        Ok(occupancy(&guard, date))
    }
}
