use std::error::Error;

use tokio::sync::{mpsc, oneshot};

use crate::journey::Command;

pub mod contacts;
pub mod engine;
pub mod geofence;
pub mod journey;
pub mod messaging;
pub mod permissions;
pub mod planner;
pub mod routing;
pub mod sos;

/// Rule violations rejected at the call boundary, before any state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyRoute,
    NoCheckpoints,
    InvalidCoordinate,
    CheckpointNotNearRoute,
    CheckpointNotPending,
    SimulationActive,
    SosSessionOpen,
    EmptyPhoneNumber,
    DuplicateContact,
    LastContact,
}

#[derive(Debug)]
pub enum EscortError {
    Validation(ValidationError),
    JourneyNotFound,
    CheckpointNotFound,
    ContactNotFound,
    SosNotOpen,
    PermissionDenied,
    Collaborator(Box<dyn Error + Send>),
    SendError(mpsc::error::SendError<Command>),
    ResponseError(oneshot::error::RecvError),
}

impl EscortError {
    pub fn collaborator<T: Error + Send + 'static>(why: T) -> Self {
        Self::Collaborator(Box::new(why))
    }
}

impl From<ValidationError> for EscortError {
    fn from(value: ValidationError) -> Self {
        EscortError::Validation(value)
    }
}

impl From<Box<dyn Error + Send>> for EscortError {
    fn from(value: Box<dyn Error + Send>) -> Self {
        EscortError::Collaborator(value)
    }
}

impl From<mpsc::error::SendError<Command>> for EscortError {
    fn from(why: mpsc::error::SendError<Command>) -> Self {
        Self::SendError(why)
    }
}

impl From<oneshot::error::RecvError> for EscortError {
    fn from(why: oneshot::error::RecvError) -> Self {
        Self::ResponseError(why)
    }
}

pub type EscortResult<O> = Result<O, EscortError>;
