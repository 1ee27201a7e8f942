use crate::model::*;

use super::EngineError;

/// Build a span from raw instants, rejecting empty/inverted ranges and instants
/// outside the supported calendar range.
pub(crate) fn validate_span(start: Ms, end: Ms) -> Result<Span, EngineError> {
    use crate::limits::*;
    if start >= end {
        return Err(EngineError::validation(
            "end_time",
            "end_time must be after start_time",
        ));
    }
    if start < MIN_VALID_TIMESTAMP_MS || end > MAX_VALID_TIMESTAMP_MS {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    Ok(Span::new(start, end))
}

/// Strict mode only: fail if `span` overlaps any booking already on the room.
pub(crate) fn check_no_conflict(rs: &RoomState, span: &Span) -> Result<(), EngineError> {
    match rs.overlapping(span).next() {
        Some(existing) => Err(EngineError::Conflict {
            existing: existing.id,
        }),
        None => Ok(()),
    }
}

/// Index pairs `(i, j)`, `i < j`, of bookings whose spans overlap.
///
/// `sorted` must be ordered by start. For a fixed `i` every later booking starts no
/// earlier, so the pair overlaps iff `sorted[i].end > sorted[j].start`, and the scan
/// stops at the first `j` that starts at or after `sorted[i].end`.
pub fn overlap_pairs(sorted: &[Booking]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for (j, b) in sorted.iter().enumerate().skip(i + 1) {
            if b.span.start >= a.span.end {
                break;
            }
            pairs.push((i, j));
        }
    }
    pairs
}
