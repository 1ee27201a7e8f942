use crate::model::{BookingId, ExternalId};

/// Which table an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Room,
    Client,
    Booking,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Room => write!(f, "room"),
            EntityKind::Client => write!(f, "client"),
            EntityKind::Booking => write!(f, "booking"),
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    /// Malformed or missing field, `start >= end`, `open >= close`, bad capacity.
    Validation { field: &'static str, reason: String },
    /// A booking points at a room or client that does not exist.
    ReferenceNotFound { entity: EntityKind, id: ExternalId },
    /// Direct lookup of an absent entity.
    NotFound { entity: EntityKind, id: u64 },
    MissingParameter(&'static str),
    InvalidFormat { field: &'static str, value: String },
    /// Only raised under `OverlapPolicy::Reject`.
    Conflict { existing: BookingId },
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: &'static str) -> Self {
        Self::validation(field, "this field is required")
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Validation { field, reason } => {
                write!(f, "invalid {field}: {reason}")
            }
            EngineError::ReferenceNotFound { entity, id } => {
                let label = match entity {
                    EntityKind::Room => "Room",
                    EntityKind::Client => "Client",
                    EntityKind::Booking => "Booking",
                };
                write!(f, "{label} id {id} not found")
            }
            EngineError::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            EngineError::MissingParameter(name) => {
                write!(f, "{name} query parameter is required")
            }
            EngineError::InvalidFormat { field, value } => {
                write!(f, "invalid format for {field}: {value:?}")
            }
            EngineError::Conflict { existing } => {
                write!(f, "overlaps existing booking: {existing}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
