use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use roombook::api::{self, ApiError};
use roombook::compactor;
use roombook::config::Config;
use roombook::engine::{Engine, LoadBatch, NewBooking, NewClient, NewRoom};
use roombook::model::{BookingId, ClientId, RoomId};
use roombook::timefmt;

#[derive(Debug, Parser)]
#[command(name = "roombook", about = "Room reservations with overlap and usage reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bulk-load rooms, clients and bookings from a JSON file.
    Load { file: PathBuf },
    Rooms,
    Clients,
    Bookings {
        #[arg(long)]
        client_id: Option<ClientId>,
    },
    RoomBookings { room_id: RoomId },
    /// Is the room free at the given instant (RFC 3339)?
    Availability {
        room_id: RoomId,
        #[arg(long)]
        time: Option<String>,
    },
    Overlaps,
    Usage,
    ClientReport,
    /// Booked share of the room's opening hours on DATE (YYYY-MM-DD, UTC).
    Occupancy { room_id: RoomId, date: String },
    CreateRoom {
        #[arg(long)]
        name: String,
        #[arg(long)]
        open_time: String,
        #[arg(long)]
        close_time: String,
        #[arg(long)]
        capacity: u32,
    },
    CreateClient {
        #[arg(long)]
        name: String,
    },
    CreateBooking {
        #[arg(long)]
        room: RoomId,
        #[arg(long)]
        client: ClientId,
        #[arg(long)]
        start_time: String,
        #[arg(long)]
        end_time: String,
    },
    DeleteBooking { booking_id: BookingId },
    DeleteRoom { room_id: RoomId },
    DeleteClient { client_id: ClientId },
    /// Rewrite the journal down to current state.
    Compact,
}

impl Command {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Command::Load { .. }
                | Command::CreateRoom { .. }
                | Command::CreateClient { .. }
                | Command::CreateBooking { .. }
                | Command::DeleteBooking { .. }
                | Command::DeleteRoom { .. }
                | Command::DeleteClient { .. }
        )
    }
}

#[derive(Debug, Serialize)]
struct Detail {
    detail: &'static str,
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError {
        status: 500,
        code: "internal_error",
        detail: e.to_string(),
    })
}

fn bad_input(detail: String) -> ApiError {
    ApiError {
        status: 400,
        code: "invalid_input",
        detail,
    }
}

async fn run(engine: &Engine, command: Command) -> Result<serde_json::Value, ApiError> {
    match command {
        Command::Load { file } => {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| bad_input(format!("{}: {e}", file.display())))?;
            let batch: LoadBatch =
                serde_json::from_str(&text).map_err(|e| bad_input(format!("malformed load file: {e}")))?;
            let summary = engine.load(batch).await?;
            to_json(&api::LoadResponse::from(&summary))
        }
        Command::Rooms => {
            let rooms: Vec<api::RoomDto> = engine.list_rooms().await.iter().map(Into::into).collect();
            to_json(&rooms)
        }
        Command::Clients => {
            let clients: Vec<api::ClientDto> =
                engine.list_clients().await.iter().map(Into::into).collect();
            to_json(&clients)
        }
        Command::Bookings { client_id } => {
            let bookings: Vec<api::BookingDto> = engine
                .list_bookings(client_id)
                .await
                .iter()
                .map(Into::into)
                .collect();
            to_json(&bookings)
        }
        Command::RoomBookings { room_id } => {
            let bookings: Vec<api::BookingDto> = engine
                .room_bookings(room_id)
                .await?
                .iter()
                .map(Into::into)
                .collect();
            to_json(&bookings)
        }
        Command::Availability { room_id, time } => {
            to_json(&api::availability_query(engine, room_id, time.as_deref()).await?)
        }
        Command::Overlaps => {
            let overlaps: Vec<api::OverlapDto> =
                engine.find_overlaps().await.iter().map(Into::into).collect();
            to_json(&overlaps)
        }
        Command::Usage => {
            let usage: Vec<api::UsageDto> = engine.room_usage().await.iter().map(Into::into).collect();
            to_json(&usage)
        }
        Command::ClientReport => {
            let report: Vec<api::ClientReportDto> = engine
                .booking_counts_by_client()
                .await
                .iter()
                .map(Into::into)
                .collect();
            to_json(&report)
        }
        Command::Occupancy { room_id, date } => {
            let date = timefmt::parse_date("date", &date)?;
            let occupancy = engine.room_occupancy(room_id, date).await?;
            to_json(&api::OccupancyDto::from(&occupancy))
        }
        Command::CreateRoom {
            name,
            open_time,
            close_time,
            capacity,
        } => {
            let req = api::CreateRoomRequest {
                name,
                open_time,
                close_time,
                capacity,
            };
            let room = engine.create_room(NewRoom::try_from(&req)?).await?;
            to_json(&api::RoomDto::from(&room))
        }
        Command::CreateClient { name } => {
            let req = api::CreateClientRequest { name };
            let client = engine.create_client(NewClient::from(&req)).await?;
            to_json(&api::ClientDto::from(&client))
        }
        Command::CreateBooking {
            room,
            client,
            start_time,
            end_time,
        } => {
            let req = api::CreateBookingRequest {
                room,
                client,
                start_time,
                end_time,
            };
            let booking = engine.create_booking(NewBooking::try_from(&req)?).await?;
            to_json(&api::BookingDto::from(&booking))
        }
        Command::DeleteBooking { booking_id } => {
            let booking = engine.delete_booking(booking_id).await?;
            to_json(&api::BookingDto::from(&booking))
        }
        Command::DeleteRoom { room_id } => {
            let room = engine.delete_room(room_id).await?;
            to_json(&api::RoomDto::from(&room))
        }
        Command::DeleteClient { client_id } => {
            let client = engine.delete_client(client_id).await?;
            to_json(&api::ClientDto::from(&client))
        }
        Command::Compact => {
            engine.compact_journal().await?;
            to_json(&Detail {
                detail: "Journal compacted",
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    roombook::observability::init(config.metrics_port)?;

    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_dir)?;
    let engine = Engine::open(&config.wal_path(), config.engine_config())?;
    info!(
        "roombook data_dir: {}, overlap policy: {:?}",
        config.data_dir.display(),
        config.overlap_policy
    );

    let mutates = cli.command.mutates();
    match run(&engine, cli.command).await {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            if mutates {
                compactor::compact_if_needed(&engine, config.compact_threshold).await?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", serde_json::to_string(&err)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
