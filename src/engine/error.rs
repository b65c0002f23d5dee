use crate::model::{Minute, ReservationId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    UnknownResource(String),
    AlreadyExists(String),
    /// Ids of every stored reservation overlapping the request, ascending.
    Conflict {
        resource: String,
        conflicting: Vec<ReservationId>,
    },
    NotFound(ReservationId),
    InvalidRange {
        start: Minute,
        end: Minute,
    },
    InvalidPriority(u8),
    /// Rescheduling found no free candidate slot.
    NoAlternative(ReservationId),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::UnknownResource(name) => write!(f, "unknown resource: {name}"),
            EngineError::AlreadyExists(name) => write!(f, "resource already exists: {name}"),
            EngineError::Conflict {
                resource,
                conflicting,
            } => write!(
                f,
                "conflict on {resource} with reservations {conflicting:?}"
            ),
            EngineError::NotFound(id) => write!(f, "reservation not found: {id}"),
            EngineError::InvalidRange { start, end } => {
                write!(f, "invalid range [{start}, {end})")
            }
            EngineError::InvalidPriority(p) => write!(f, "priority {p} outside 1..=10"),
            EngineError::NoAlternative(id) => {
                write!(f, "no free alternative slot for reservation {id}")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
