use chrono::{NaiveDate, NaiveTime};
use proptest::prelude::*;

use roombook::engine::{Engine, EngineConfig, NewBooking, NewClient, NewRoom, usage_percentage};
use roombook::model::Ms;

const MINUTE: Ms = 60_000;
/// 2024-04-01T00:00:00Z
const DAY: Ms = 1_711_929_600_000;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Bookings as (start minute, length in minutes) within one day.
fn bookings() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0i64..1_380, 1i64..180), 0..40)
}

/// One room open 09:00-17:00 holding `spans`, in creation order.
async fn room_with(spans: &[(i64, i64)]) -> Engine {
    let engine = Engine::in_memory(EngineConfig::default());
    let room = engine
        .create_room(NewRoom {
            name: "A".into(),
            open_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            close_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            capacity: 4,
        })
        .await
        .unwrap();
    let client = engine
        .create_client(NewClient { name: "c".into() })
        .await
        .unwrap();
    for &(start, len) in spans {
        engine
            .create_booking(NewBooking {
                room_id: room.id,
                client_id: client.id,
                start: DAY + start * MINUTE,
                end: DAY + (start + len) * MINUTE,
            })
            .await
            .unwrap();
    }
    engine
}

proptest! {
    #[test]
    fn overlaps_match_every_pair_check(spans in bookings()) {
        runtime().block_on(async {
            let engine = room_with(&spans).await;
            let sorted = engine.room_bookings(1).await.unwrap();
            let mut expected = Vec::new();
            for i in 0..sorted.len() {
                for j in i + 1..sorted.len() {
                    let (a, b) = (&sorted[i].span, &sorted[j].span);
                    if a.start < b.end && b.start < a.end {
                        expected.push((sorted[i].id, sorted[j].id));
                    }
                }
            }
            let found: Vec<_> = engine
                .find_overlaps()
                .await
                .iter()
                .map(|p| (p.first.id, p.second.id))
                .collect();
            prop_assert_eq!(found, expected);
            Ok(())
        })?;
    }

    #[test]
    fn available_iff_no_booking_contains_instant(spans in bookings(), minute in 0i64..1_440) {
        runtime().block_on(async {
            let engine = room_with(&spans).await;
            let t = DAY + minute * MINUTE;
            let occupied = spans
                .iter()
                .any(|&(s, l)| DAY + s * MINUTE <= t && t <= DAY + (s + l) * MINUTE);
            let availability = engine.is_available(1, t).await.unwrap();
            prop_assert_eq!(availability.available, !occupied);
            Ok(())
        })?;
    }

    #[test]
    fn usage_follows_count(spans in bookings()) {
        runtime().block_on(async {
            let engine = room_with(&spans).await;
            let usage = engine.room_usage().await;
            prop_assert_eq!(usage[0].usage_percentage as usize, (spans.len() * 10).min(100));
            prop_assert_eq!(usage[0].usage_percentage, usage_percentage(spans.len()));
            Ok(())
        })?;
    }

    #[test]
    fn occupancy_counts_each_open_minute_once(spans in bookings()) {
        runtime().block_on(async {
            let engine = room_with(&spans).await;
            let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
            let occ = engine.room_occupancy(1, date).await.unwrap();

            // Minute m (09:00 <= m < 17:00) is booked if some booking covers [m, m+1).
            let booked_minutes = (9 * 60..17 * 60)
                .filter(|&m| spans.iter().any(|&(s, l)| s <= m && m + 1 <= s + l))
                .count() as i64;
            prop_assert_eq!(occ.open_ms, 8 * 60 * MINUTE);
            prop_assert_eq!(occ.booked_ms, booked_minutes * MINUTE);
            prop_assert!(occ.percentage <= 100);
            Ok(())
        })?;
    }
}
