use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::approval::{DocumentId, LineId, StaffId};
use crate::domain::roster::{LeaveKind, ShiftKind};

/// Rejected before any state mutation; surfaced directly to the caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("at least one approver is required")]
    ApproverRequired,
    #[error("approver move out of bounds: {from} -> {to} with {len} entries")]
    MoveOutOfBounds { from: usize, to: usize, len: usize },
    #[error("staff pool is empty")]
    EmptyStaffPool,
    #[error("plan key `{plan_key}` was already used for a different request")]
    PlanKeyReuse { plan_key: String },
}

/// Action attempted on a line that is not currently actionable. Stale
/// reads and lost races land here; callers recover by re-fetching and
/// re-evaluating, never by silent retry.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("document `{document_id}` not found")]
    DocumentNotFound { document_id: DocumentId },
    #[error("line `{line_id}` not found on document `{document_id}`")]
    LineNotFound { document_id: DocumentId, line_id: LineId },
    #[error("action `{action}` does not apply to {kind} line `{line_id}`")]
    ActionKindMismatch { line_id: LineId, kind: &'static str, action: &'static str },
    #[error("line `{line_id}` is already {status}")]
    AlreadyActed { line_id: LineId, status: &'static str },
    #[error("line `{line_id}` is not actionable: {reason}")]
    NotActionable { line_id: LineId, reason: String },
    #[error("line `{line_id}` on document `{document_id}` changed concurrently")]
    LostRace { document_id: DocumentId, line_id: LineId },
}

/// Single-assignment rejection; the caller must choose a different
/// candidate or date.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConflictError {
    #[error("staff `{staff_id}` is on {kind} leave {from_date}..={to_date} covering {date}")]
    OnLeave {
        staff_id: StaffId,
        date: NaiveDate,
        from_date: NaiveDate,
        to_date: NaiveDate,
        kind: LeaveKind,
    },
    #[error("staff `{staff_id}` already holds a {shift} assignment on {date}")]
    Duplicate { staff_id: StaffId, date: NaiveDate, shift: ShiftKind },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Conflict(#[from] ConflictError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Conflict { .. } => {
                "The requested change conflicts with the current schedule state."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::Conflict(conflict)) => Self::Conflict {
                message: conflict.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Domain(DomainError::Transition(transition)) => Self::Conflict {
                message: transition.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Domain(DomainError::Validation(validation)) => Self::BadRequest {
                message: validation.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
