use chrono::NaiveDate;

use crate::model::*;

/// A room is free at `t` unless some booking contains it (closed on both ends).
pub fn is_free_at(rs: &RoomState, t: Ms) -> bool {
    rs.containing(t).next().is_none()
}

/// The room's operating hours on `date`, as UTC instants.
pub fn operating_window(room: &Room, date: NaiveDate) -> Span {
    let open = date.and_time(room.open_time).and_utc().timestamp_millis();
    let close = date.and_time(room.close_time).and_utc().timestamp_millis();
    Span::new(open, close)
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end
        {
            last.end = last.end.max(span.end);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// Total time inside `window` covered by at least one booking.
/// Concurrent bookings are counted once.
pub fn booked_within(rs: &RoomState, window: &Span) -> Ms {
    // Clipping keeps start order: max(start, window.start) is monotonic in start.
    let clipped: Vec<Span> = rs
        .overlapping(window)
        .filter_map(|b| b.span.intersection(window))
        .collect();
    merge_overlapping(&clipped)
        .iter()
        .map(Span::duration_ms)
        .sum()
}

pub fn occupancy(rs: &RoomState, date: NaiveDate) -> Occupancy {
    let window = operating_window(&rs.room, date);
    let open_ms = window.duration_ms();
    let booked_ms = booked_within(rs, &window);
    let percentage = (booked_ms * 100 / open_ms).clamp(0, 100) as u8;
    Occupancy {
        room_id: rs.room.id,
        room_name: rs.room.name.clone(),
        date,
        open_ms,
        booked_ms,
        percentage,
    }
}
