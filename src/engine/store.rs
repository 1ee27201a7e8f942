use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::model::*;

pub type SharedRoomState = Arc<RwLock<RoomState>>;

/// Authoritative in-memory set of rooms, clients and bookings.
///
/// Bookings live inside their room's `RoomState` (sorted by start) behind a
/// per-room lock. The two side indexes map a booking to its room and a client to
/// its bookings; both are only touched while the owning room's write lock is held.
pub struct BookingStore {
    rooms: DashMap<RoomId, SharedRoomState>,
    clients: DashMap<ClientId, Client>,
    booking_to_room: DashMap<BookingId, RoomId>,
    client_bookings: DashMap<ClientId, Vec<BookingId>>,
}

impl Default for BookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            clients: DashMap::new(),
            booking_to_room: DashMap::new(),
            client_bookings: DashMap::new(),
        }
    }

    // ── Rooms ────────────────────────────────────────────────

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains_room(&self, id: &RoomId) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn get_room_state(&self, id: &RoomId) -> Option<SharedRoomState> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn insert_room(&self, room: Room) {
        self.rooms
            .insert(room.id, Arc::new(RwLock::new(RoomState::new(room))));
    }

    pub fn remove_room(&self, id: &RoomId) -> Option<SharedRoomState> {
        self.rooms.remove(id).map(|(_, rs)| rs)
    }

    /// Room ids in ascending order, the order every report walks rooms in.
    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    // ── Clients ──────────────────────────────────────────────

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn contains_client(&self, id: &ClientId) -> bool {
        self.clients.contains_key(id)
    }

    pub fn get_client(&self, id: &ClientId) -> Option<Client> {
        self.clients.get(id).map(|e| e.value().clone())
    }

    pub fn insert_client(&self, client: Client) {
        self.clients.insert(client.id, client);
    }

    pub fn remove_client(&self, id: &ClientId) -> Option<Client> {
        self.client_bookings.remove(id);
        self.clients.remove(id).map(|(_, c)| c)
    }

    /// All clients, ascending by id.
    pub fn clients(&self) -> Vec<Client> {
        let mut clients: Vec<Client> = self.clients.iter().map(|e| e.value().clone()).collect();
        clients.sort_unstable_by_key(|c| c.id);
        clients
    }

    // ── Booking indexes ──────────────────────────────────────

    pub fn booking_count(&self) -> usize {
        self.booking_to_room.len()
    }

    pub fn get_room_for_booking(&self, id: &BookingId) -> Option<RoomId> {
        self.booking_to_room.get(id).map(|e| *e.value())
    }

    pub fn client_booking_ids(&self, client_id: &ClientId) -> Vec<BookingId> {
        self.client_bookings
            .get(client_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn client_booking_count(&self, client_id: &ClientId) -> usize {
        self.client_bookings
            .get(client_id)
            .map_or(0, |e| e.value().len())
    }

    fn index_booking(&self, booking: &Booking) {
        self.booking_to_room.insert(booking.id, booking.room_id);
        self.client_bookings
            .entry(booking.client_id)
            .or_default()
            .push(booking.id);
    }

    fn unindex_booking(&self, booking: &Booking) {
        self.booking_to_room.remove(&booking.id);
        if let Some(mut ids) = self.client_bookings.get_mut(&booking.client_id) {
            ids.retain(|id| *id != booking.id);
        }
    }

    // ── Reads ────────────────────────────────────────────────

    /// Bookings of a room by start time, ties by id. `None` if the room is unknown.
    pub async fn list_by_room(&self, room_id: &RoomId) -> Option<Vec<Booking>> {
        let rs = self.get_room_state(room_id)?;
        let guard = rs.read().await;
        Some(guard.bookings.clone())
    }

    /// Bookings of a client in creation (id) order.
    pub async fn list_by_client(&self, client_id: &ClientId) -> Vec<Booking> {
        let mut bookings = Vec::new();
        for id in self.client_booking_ids(client_id) {
            if let Some(b) = self.get_booking(&id).await {
                bookings.push(b);
            }
        }
        bookings.sort_unstable_by_key(|b| b.id);
        bookings
    }

    pub async fn get_booking(&self, id: &BookingId) -> Option<Booking> {
        let room_id = self.get_room_for_booking(id)?;
        let rs = self.get_room_state(&room_id)?;
        let guard = rs.read().await;
        guard.get_booking(*id).cloned()
    }

    // ── Event application ────────────────────────────────────

    /// Apply a booking event to a room. Caller holds the room's write lock.
    pub fn apply_event(&self, rs: &mut RoomState, event: &Event) {
        match event {
            Event::BookingCreated { booking } => {
                self.index_booking(booking);
                rs.insert_booking(booking.clone());
            }
            Event::BookingDeleted { id, .. } => {
                if let Some(booking) = rs.remove_booking(*id) {
                    self.unindex_booking(&booking);
                }
            }
            // Room/client lifecycle and id watermarks live at the map level.
            Event::RoomCreated { .. }
            | Event::RoomDeleted { .. }
            | Event::ClientCreated { .. }
            | Event::ClientDeleted { .. }
            | Event::IdWatermark { .. } => {}
        }
    }

    /// Drop index entries for every booking still on a removed room.
    pub fn forget_bookings(&self, rs: &RoomState) {
        for booking in &rs.bookings {
            self.unindex_booking(booking);
        }
    }
}
