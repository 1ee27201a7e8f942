use std::time::{Duration, Instant};

use chrono::NaiveTime;
use roombook::engine::{Engine, EngineConfig, NewBooking, NewClient, NewRoom};

const HOUR: i64 = 3_600_000; // 1 hour in ms
const MINUTE: i64 = 60_000;
/// 2024-04-01T00:00:00Z
const DAY: i64 = 1_711_929_600_000;

const ROOMS: u64 = 50;
const BOOKINGS_PER_ROOM: i64 = 2_000;
const ITERATIONS: usize = 50;
const QUERIES: usize = 10_000;

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.3}ms, p50={:.3}ms, p95={:.3}ms, p99={:.3}ms, max={:.3}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies.last().map_or(0.0, |d| d.as_secs_f64() * 1000.0),
    );
}

/// Every room gets back-to-back half-hour bookings with one 45-minute booking in
/// every ten, so a small fraction of neighbours overlap.
async fn populate(engine: &Engine) {
    let client = engine
        .create_client(NewClient {
            name: "bench".into(),
        })
        .await
        .expect("create client");
    for r in 0..ROOMS {
        let room = engine
            .create_room(NewRoom {
                name: format!("Room {r}"),
                open_time: NaiveTime::from_hms_opt(0, 0, 0).expect("midnight"),
                close_time: NaiveTime::from_hms_opt(23, 59, 0).expect("late"),
                capacity: 10,
            })
            .await
            .expect("create room");
        for i in 0..BOOKINGS_PER_ROOM {
            let start = DAY + i * 30 * MINUTE;
            let len = if i % 10 == 0 { 45 * MINUTE } else { 30 * MINUTE };
            engine
                .create_booking(NewBooking {
                    room_id: room.id,
                    client_id: client.id,
                    start,
                    end: start + len,
                })
                .await
                .expect("create booking");
        }
    }
}

#[tokio::main]
async fn main() {
    let engine = Engine::in_memory(EngineConfig::default());

    let started = Instant::now();
    populate(&engine).await;
    println!(
        "populated {ROOMS} rooms x {BOOKINGS_PER_ROOM} bookings in {:.2}s",
        started.elapsed().as_secs_f64()
    );

    let mut overlap_latencies = Vec::with_capacity(ITERATIONS);
    let mut found = 0;
    for _ in 0..ITERATIONS {
        let t = Instant::now();
        found = engine.find_overlaps().await.len();
        overlap_latencies.push(t.elapsed());
    }
    println!("find_overlaps ({found} pairs):");
    print_latency("latency", &mut overlap_latencies);

    let span = BOOKINGS_PER_ROOM * 30 * MINUTE;
    let mut query_latencies = Vec::with_capacity(QUERIES);
    for i in 0..QUERIES {
        let room_id = (i as u64 % ROOMS) + 1;
        let t = DAY + (i as i64 * 7 * MINUTE) % (span + HOUR);
        let started = Instant::now();
        let _ = engine.is_available(room_id, t).await;
        query_latencies.push(started.elapsed());
    }
    println!("is_available:");
    print_latency("latency", &mut query_latencies);
}
