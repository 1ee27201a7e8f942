use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveTime;
use tracing::debug;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::{check_no_conflict, validate_span};
use super::{Engine, EngineError, EntityKind, OverlapPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoom {
    pub name: String,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub room_id: RoomId,
    pub client_id: ClientId,
    pub start: Ms,
    pub end: Ms,
}

fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::validation("name", "this field may not be blank"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(EngineError::validation(
            "name",
            format!("ensure this field has no more than {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

impl NewRoom {
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_name(&self.name)?;
        if self.open_time >= self.close_time {
            return Err(EngineError::validation(
                "close_time",
                "close_time must be after open_time",
            ));
        }
        if self.capacity == 0 {
            return Err(EngineError::validation(
                "capacity",
                "capacity must be a positive integer",
            ));
        }
        Ok(())
    }
}

impl NewClient {
    pub fn validate(&self) -> Result<(), EngineError> {
        validate_name(&self.name)
    }
}

impl Engine {
    pub async fn create_room(&self, new: NewRoom) -> Result<Room, EngineError> {
        let started = Instant::now();
        let _gate = self.batch_gate.read().await;
        let result = self.create_room_locked(new).await;
        observability::record_operation("create_room", started, &result);
        result
    }

    /// Caller holds the batch gate.
    pub(super) async fn create_room_locked(&self, new: NewRoom) -> Result<Room, EngineError> {
        new.validate()?;
        if self.store.room_count() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }
        let room = Room {
            id: self.ids.next_room(),
            name: new.name,
            open_time: new.open_time,
            close_time: new.close_time,
            capacity: new.capacity,
        };
        self.journal
            .append(&Event::RoomCreated { room: room.clone() })
            .await?;
        self.store.insert_room(room.clone());
        debug!(room_id = room.id, name = %room.name, "room created");
        Ok(room)
    }

    pub async fn create_client(&self, new: NewClient) -> Result<Client, EngineError> {
        let started = Instant::now();
        let _gate = self.batch_gate.read().await;
        let result = self.create_client_locked(new).await;
        observability::record_operation("create_client", started, &result);
        result
    }

    /// Caller holds the batch gate.
    pub(super) async fn create_client_locked(&self, new: NewClient) -> Result<Client, EngineError> {
        new.validate()?;
        if self.store.client_count() >= MAX_CLIENTS {
            return Err(EngineError::LimitExceeded("too many clients"));
        }
        let client = Client {
            id: self.ids.next_client(),
            name: new.name,
        };
        self.journal
            .append(&Event::ClientCreated {
                client: client.clone(),
            })
            .await?;
        self.store.insert_client(client.clone());
        debug!(client_id = client.id, "client created");
        Ok(client)
    }

    /// Add a booking to a room. Overlapping bookings are accepted unless the
    /// engine runs with `OverlapPolicy::Reject`.
    pub async fn create_booking(&self, new: NewBooking) -> Result<Booking, EngineError> {
        let started = Instant::now();
        let _gate = self.batch_gate.read().await;
        let result = self.create_booking_locked(new).await;
        observability::record_operation("create_booking", started, &result);
        result
    }

    /// Caller holds the batch gate.
    pub(super) async fn create_booking_locked(&self, new: NewBooking) -> Result<Booking, EngineError> {
        let span = validate_span(new.start, new.end)?;
        let rs = self
            .store
            .get_room_state(&new.room_id)
            .ok_or(EngineError::ReferenceNotFound {
                entity: EntityKind::Room,
                id: new.room_id.into(),
            })?;
        if !self.store.contains_client(&new.client_id) {
            return Err(EngineError::ReferenceNotFound {
                entity: EntityKind::Client,
                id: new.client_id.into(),
            });
        }

        let mut guard = rs.write().await;
        if guard.bookings.len() >= MAX_BOOKINGS_PER_ROOM {
            return Err(EngineError::LimitExceeded("too many bookings on room"));
        }
        if self.config.overlap_policy == OverlapPolicy::Reject {
            check_no_conflict(&guard, &span)?;
        }

        let booking = Booking {
            id: self.ids.next_booking(),
            room_id: new.room_id,
            client_id: new.client_id,
            span,
        };
        let event = Event::BookingCreated {
            booking: booking.clone(),
        };
        self.persist_and_apply(&mut guard, &event).await?;
        drop(guard);

        metrics::gauge!(observability::BOOKINGS_ACTIVE).set(self.store.booking_count() as f64);
        debug!(
            booking_id = booking.id,
            room_id = booking.room_id,
            client_id = booking.client_id,
            "booking created"
        );
        Ok(booking)
    }

    pub async fn delete_booking(&self, id: BookingId) -> Result<Booking, EngineError> {
        let started = Instant::now();
        let _gate = self.batch_gate.read().await;
        let result = self.delete_booking_locked(id).await;
        observability::record_operation("delete_booking", started, &result);
        result
    }

    async fn delete_booking_locked(&self, id: BookingId) -> Result<Booking, EngineError> {
        let not_found = EngineError::NotFound {
            entity: EntityKind::Booking,
            id,
        };
        let Some(room_id) = self.store.get_room_for_booking(&id) else {
            return Err(not_found);
        };
        let Some(rs) = self.store.get_room_state(&room_id) else {
            return Err(not_found);
        };
        let mut guard = rs.write().await;
        // A concurrent delete may have won the race for the lock.
        let Some(booking) = guard.get_booking(id).cloned() else {
            return Err(not_found);
        };
        self.persist_and_apply(&mut guard, &Event::BookingDeleted { id, room_id })
            .await?;
        drop(guard);

        metrics::gauge!(observability::BOOKINGS_ACTIVE).set(self.store.booking_count() as f64);
        debug!(booking_id = id, room_id, "booking deleted");
        Ok(booking)
    }

    /// Delete a room and every booking on it.
    pub async fn delete_room(&self, id: RoomId) -> Result<Room, EngineError> {
        let started = Instant::now();
        // Exclusive: no booking may be created against the room mid-cascade.
        let _gate = self.batch_gate.write().await;
        let result = self.delete_room_locked(id).await;
        observability::record_operation("delete_room", started, &result);
        result
    }

    async fn delete_room_locked(&self, id: RoomId) -> Result<Room, EngineError> {
        let rs = self.store.get_room_state(&id).ok_or(EngineError::NotFound {
            entity: EntityKind::Room,
            id,
        })?;
        let mut guard = rs.write().await;
        let booking_ids: Vec<BookingId> = guard.bookings.iter().map(|b| b.id).collect();
        for booking_id in &booking_ids {
            let event = Event::BookingDeleted {
                id: *booking_id,
                room_id: id,
            };
            self.persist_and_apply(&mut guard, &event).await?;
        }
        self.journal.append(&Event::RoomDeleted { id }).await?;
        let room = guard.room.clone();
        drop(guard);
        self.store.remove_room(&id);

        metrics::gauge!(observability::BOOKINGS_ACTIVE).set(self.store.booking_count() as f64);
        debug!(room_id = id, cascaded = booking_ids.len(), "room deleted");
        Ok(room)
    }

    /// Delete a client and every booking it holds, across all rooms.
    pub async fn delete_client(&self, id: ClientId) -> Result<Client, EngineError> {
        let started = Instant::now();
        let _gate = self.batch_gate.write().await;
        let result = self.delete_client_locked(id).await;
        observability::record_operation("delete_client", started, &result);
        result
    }

    async fn delete_client_locked(&self, id: ClientId) -> Result<Client, EngineError> {
        let client = self.store.get_client(&id).ok_or(EngineError::NotFound {
            entity: EntityKind::Client,
            id,
        })?;

        // Group by room; BTreeMap keeps the lock order ascending by room id.
        let mut by_room: BTreeMap<RoomId, Vec<BookingId>> = BTreeMap::new();
        for booking_id in self.store.client_booking_ids(&id) {
            if let Some(room_id) = self.store.get_room_for_booking(&booking_id) {
                by_room.entry(room_id).or_default().push(booking_id);
            }
        }

        let mut cascaded = 0usize;
        for (room_id, booking_ids) in by_room {
            let Some(rs) = self.store.get_room_state(&room_id) else {
                continue;
            };
            let mut guard = rs.write().await;
            for booking_id in booking_ids {
                let event = Event::BookingDeleted {
                    id: booking_id,
                    room_id,
                };
                self.persist_and_apply(&mut guard, &event).await?;
                cascaded += 1;
            }
        }

        self.journal.append(&Event::ClientDeleted { id }).await?;
        self.store.remove_client(&id);

        metrics::gauge!(observability::BOOKINGS_ACTIVE).set(self.store.booking_count() as f64);
        debug!(client_id = id, cascaded, "client deleted");
        Ok(client)
    }
}
