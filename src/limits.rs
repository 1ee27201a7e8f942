use crate::model::Ms;

/// Width of the name column for rooms and clients.
pub const MAX_NAME_LEN: usize = 100;

pub const MAX_ROOMS: usize = 10_000;
pub const MAX_CLIENTS: usize = 1_000_000;
pub const MAX_BOOKINGS_PER_ROOM: usize = 100_000;

/// Max payloads (rooms + clients + bookings) in a single bulk load.
pub const MAX_BATCH_ITEMS: usize = 100_000;

/// 0001-01-01T00:00:00Z
pub const MIN_VALID_TIMESTAMP_MS: Ms = -62_135_596_800_000;
/// 9999-12-31T23:59:59.999Z
pub const MAX_VALID_TIMESTAMP_MS: Ms = 253_402_300_799_999;
