mod availability;
mod bulk;
mod conflict;
mod error;
mod journal;
mod mutations;
mod queries;
mod reports;
mod store;

pub use availability::{booked_within, is_free_at, merge_overlapping, operating_window};
pub use bulk::{BookingPayload, ClientPayload, LoadBatch, LoadSummary, RoomPayload};
pub use conflict::overlap_pairs;
pub use error::{EngineError, EntityKind};
pub use journal::{Journal, MemoryJournal, WalJournal};
pub use mutations::{NewBooking, NewClient, NewRoom};
pub use reports::usage_percentage;
pub use store::{BookingStore, SharedRoomState};

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::model::*;
use crate::wal::Wal;

/// What to do when a new booking overlaps an existing one on the same room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Store it; the overlap shows up in `find_overlaps`.
    #[default]
    Permit,
    /// Refuse it with `EngineError::Conflict`.
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub overlap_policy: OverlapPolicy,
}

/// Monotonic id counters, one per entity kind. Ids start at 1.
#[derive(Debug)]
pub(super) struct IdSequence {
    room: AtomicU64,
    client: AtomicU64,
    booking: AtomicU64,
}

impl IdSequence {
    fn new() -> Self {
        Self {
            room: AtomicU64::new(1),
            client: AtomicU64::new(1),
            booking: AtomicU64::new(1),
        }
    }

    pub(super) fn next_room(&self) -> RoomId {
        self.room.fetch_add(1, Ordering::Relaxed)
    }

    pub(super) fn next_client(&self) -> ClientId {
        self.client.fetch_add(1, Ordering::Relaxed)
    }

    pub(super) fn next_booking(&self) -> BookingId {
        self.booking.fetch_add(1, Ordering::Relaxed)
    }

    fn raise(counter: &AtomicU64, next: u64) {
        counter.fetch_max(next, Ordering::Relaxed);
    }

    pub(super) fn watermark(&self) -> Event {
        Event::IdWatermark {
            next_room: self.room.load(Ordering::Relaxed),
            next_client: self.client.load(Ordering::Relaxed),
            next_booking: self.booking.load(Ordering::Relaxed),
        }
    }
}

pub struct Engine {
    pub(super) store: BookingStore,
    pub(super) journal: Arc<dyn Journal>,
    pub(super) config: EngineConfig,
    pub(super) ids: IdSequence,
    /// Held shared by every operation and exclusively by a bulk load, so readers
    /// never see a batch half-applied.
    pub(super) batch_gate: RwLock<()>,
}

impl Engine {
    /// Engine with no durability.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::with_journal(Arc::new(MemoryJournal), config)
    }

    /// Engine over an arbitrary journal, starting empty.
    pub fn with_journal(journal: Arc<dyn Journal>, config: EngineConfig) -> Self {
        Self {
            store: BookingStore::new(),
            journal,
            config,
            ids: IdSequence::new(),
            batch_gate: RwLock::new(()),
        }
    }

    /// Replay the WAL at `wal_path` and keep appending to it.
    /// Must be called inside a tokio runtime (the WAL writer is a task).
    pub fn open(wal_path: &Path, config: EngineConfig) -> std::io::Result<Self> {
        let (wal, replay) = Wal::open(wal_path)?;
        if let Some(damage) = replay.damage {
            tracing::warn!(
                path = %wal_path.display(),
                ?damage,
                dropped_bytes = replay.dropped_bytes,
                "journal tail discarded"
            );
        }
        let engine = Self::with_journal(Arc::new(WalJournal::spawn(wal)), config);
        for event in &replay.events {
            engine.replay_event(event);
        }
        tracing::info!(
            path = %wal_path.display(),
            events = replay.events.len(),
            dropped_bytes = replay.dropped_bytes,
            rooms = engine.store.room_count(),
            clients = engine.store.client_count(),
            bookings = engine.store.booking_count(),
            "journal replayed"
        );
        Ok(engine)
    }

    /// Apply one replayed event. We are the sole owner of every room lock here,
    /// so `try_write` always succeeds; never block, this may run inside a runtime.
    fn replay_event(&self, event: &Event) {
        match event {
            Event::RoomCreated { room } => {
                IdSequence::raise(&self.ids.room, room.id + 1);
                self.store.insert_room(room.clone());
            }
            Event::RoomDeleted { id } => {
                if let Some(rs) = self.store.remove_room(id)
                    && let Ok(guard) = rs.try_read()
                {
                    self.store.forget_bookings(&guard);
                }
            }
            Event::ClientCreated { client } => {
                IdSequence::raise(&self.ids.client, client.id + 1);
                self.store.insert_client(client.clone());
            }
            Event::ClientDeleted { id } => {
                self.store.remove_client(id);
            }
            Event::BookingCreated { booking } => {
                IdSequence::raise(&self.ids.booking, booking.id + 1);
                self.apply_replayed(booking.room_id, event);
            }
            Event::BookingDeleted { room_id, .. } => {
                self.apply_replayed(*room_id, event);
            }
            Event::IdWatermark {
                next_room,
                next_client,
                next_booking,
            } => {
                IdSequence::raise(&self.ids.room, *next_room);
                IdSequence::raise(&self.ids.client, *next_client);
                IdSequence::raise(&self.ids.booking, *next_booking);
            }
        }
    }

    fn apply_replayed(&self, room_id: RoomId, event: &Event) {
        let Some(rs) = self.store.get_room_state(&room_id) else {
            tracing::warn!(room_id, "replay: event for unknown room skipped");
            return;
        };
        match rs.try_write() {
            Ok(mut guard) => self.store.apply_event(&mut guard, event),
            Err(_) => tracing::warn!(room_id, "replay: room lock contended, event skipped"),
        };
    }

    /// Journal-append + apply in one call. Caller holds the room's write lock.
    pub(super) async fn persist_and_apply(
        &self,
        rs: &mut RoomState,
        event: &Event,
    ) -> Result<(), EngineError> {
        self.journal.append(event).await?;
        self.store.apply_event(rs, event);
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &BookingStore {
        &self.store
    }

    /// Rewrite the journal as: id watermark, rooms, clients, bookings (each by id).
    pub async fn compact_journal(&self) -> Result<(), EngineError> {
        // Exclusive: nothing may commit between the snapshot and the swap.
        let _gate = self.batch_gate.write().await;

        let mut events = vec![self.ids.watermark()];
        let mut bookings = Vec::new();
        for room_id in self.store.room_ids() {
            let Some(rs) = self.store.get_room_state(&room_id) else {
                continue;
            };
            let guard = rs.read().await;
            events.push(Event::RoomCreated {
                room: guard.room.clone(),
            });
            bookings.extend(guard.bookings.iter().cloned());
        }
        for client in self.store.clients() {
            events.push(Event::ClientCreated { client });
        }
        bookings.sort_unstable_by_key(|b| b.id);
        events.extend(
            bookings
                .into_iter()
                .map(|booking| Event::BookingCreated { booking }),
        );

        let count = events.len();
        self.journal.compact(events).await?;
        tracing::info!(events = count, "journal compacted");
        Ok(())
    }

    pub async fn journal_appends_since_compact(&self) -> u64 {
        self.journal.appends_since_compact().await
    }
}
