use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Unix milliseconds (UTC). The only instant type inside the engine.
pub type Ms = i64;

pub type RoomId = u64;
pub type ClientId = u64;
pub type BookingId = u64;

/// Caller-supplied key that cross-references payloads within one bulk load.
/// Accepts either a JSON number or a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExternalId {
    Number(u64),
    Text(String),
}

impl From<u64> for ExternalId {
    fn from(id: u64) -> Self {
        ExternalId::Number(id)
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalId::Number(n) => write!(f, "{n}"),
            ExternalId::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Time range of a booking.
///
/// Overlap is half-open (`[start, end)` against `[start, end)`), so back-to-back
/// bookings do not collide. Containment of an instant is closed on both ends, so a
/// query landing exactly on a boundary counts as occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t <= self.end
    }

    /// The overlapping part of two spans, if they overlap at all.
    pub fn intersection(&self, other: &Span) -> Option<Span> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Span::new(self.start.max(other.start), self.end.min(other.end)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    /// Always positive.
    pub capacity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub room_id: RoomId,
    pub client_id: ClientId,
    pub span: Span,
}

/// A room plus every booking placed on it.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room: Room,
    /// Sorted by `(span.start, id)`; ids grow with insertion so ties keep insertion order.
    pub bookings: Vec<Booking>,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            bookings: Vec::new(),
        }
    }

    pub fn id(&self) -> RoomId {
        self.room.id
    }

    /// Insert booking maintaining sort order by `(span.start, id)`.
    pub fn insert_booking(&mut self, booking: Booking) {
        let key = (booking.span.start, booking.id);
        let pos = self
            .bookings
            .partition_point(|b| (b.span.start, b.id) <= key);
        self.bookings.insert(pos, booking);
    }

    /// Remove booking by id.
    pub fn remove_booking(&mut self, id: BookingId) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }

    pub fn get_booking(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    /// Bookings whose span overlaps the query window (half-open).
    /// Binary search skips everything starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        let right_bound = self
            .bookings
            .partition_point(|b| b.span.start < query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span.end > query.start)
    }

    /// Bookings whose span contains the instant (closed on both ends).
    pub fn containing(&self, t: Ms) -> impl Iterator<Item = &Booking> {
        let right_bound = self.bookings.partition_point(|b| b.span.start <= t);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span.contains_instant(t))
    }
}

/// Journal record format. Flat, one variant per state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    RoomCreated { room: Room },
    RoomDeleted { id: RoomId },
    ClientCreated { client: Client },
    ClientDeleted { id: ClientId },
    BookingCreated { booking: Booking },
    BookingDeleted { id: BookingId, room_id: RoomId },
    /// Next ids to hand out. Written first on compaction so ids of deleted
    /// entities are never reissued after a restart.
    IdWatermark {
        next_room: RoomId,
        next_client: ClientId,
        next_booking: BookingId,
    },
}

// ── Query result types ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub room_id: RoomId,
    pub room_name: String,
    pub available: bool,
}

/// Two bookings of the same room whose spans overlap. `first` starts no later than `second`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapPair {
    pub room_id: RoomId,
    pub room_name: String,
    pub first: Booking,
    pub second: Booking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomUsage {
    pub room_id: RoomId,
    pub room_name: String,
    pub usage_percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientBookingCount {
    pub client_id: ClientId,
    pub client_name: String,
    pub booking_count: usize,
}

/// Booked share of a room's operating window on one UTC date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    pub room_id: RoomId,
    pub room_name: String,
    pub date: NaiveDate,
    pub open_ms: Ms,
    pub booked_ms: Ms,
    pub percentage: u8,
}
