//! Error types shared by the engine core.
//!
//! [`EngineError`] covers everything the host can get back from the public
//! API (registration, configuration, persistence, worker threads).
//! [`HandlerError`] and [`MoveError`] are the failure types of the two
//! external collaborator traits; they never escape the simulation or the
//! dispatch thread, they are logged at the boundary instead.

use thiserror::Error;

use crate::components::eventobject::EventId;

/// Errors returned by the engine's public operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An event with the same id is already part of the active set.
    #[error("event id {0} is already registered in the active set")]
    DuplicateId(EventId),
    /// No active event carries the given id.
    #[error("no active event with id {0}")]
    UnknownEvent(EventId),
    /// A textual value could not be parsed into the named type.
    #[error("invalid {kind} value '{value}'")]
    Parse { kind: &'static str, value: String },
    /// A polygon needs at least two vertices.
    #[error("polygon {id} has {vertices} vertex(es), at least 2 are required")]
    InvalidPolygon { id: EventId, vertices: usize },
    /// The configuration file could not be loaded or saved.
    #[error("config error: {0}")]
    Config(String),
    /// The frame schedule could not be built.
    #[error("schedule error: {0}")]
    Schedule(String),
    /// A worker thread could not be reached or started.
    #[error("worker thread error: {0}")]
    Worker(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failure reported by an [`EventHandler`](crate::components::eventhandler::EventHandler)
/// callback or a posted job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failure reported by a [`MovementHandler`](crate::components::movehandler::MovementHandler).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct MoveError(pub String);

impl MoveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Best-effort text of a panic payload caught with `catch_unwind`.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
