use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use wardline_core::domain::approval::{ApprovalDocument, ApprovalLine, DocumentId};
use wardline_core::domain::roster::{ApprovedLeave, ShiftAssignment};

pub mod document;
pub mod memory;
pub mod plan;
pub mod roster;

pub use document::SqlDocumentRepository;
pub use memory::{
    InMemoryAssignmentRepository, InMemoryDocumentRepository, InMemoryLeaveRepository,
    InMemoryPlanRepository,
};
pub use plan::{RosterPlanRecord, SqlPlanRepository};
pub use roster::{SqlAssignmentRepository, SqlLeaveRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Outcome of attempting to insert a shift assignment. A duplicate
/// slot is a normal concurrent outcome, not a database failure, so it
/// is reported in-band rather than as an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    DuplicateSlot,
}

/// Outcome of recording a bulk plan. The ledger is first-writer-wins:
/// a key that is already present keeps its stored record, and the
/// caller is told it lost the write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    AlreadyRecorded,
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &DocumentId,
    ) -> Result<Option<ApprovalDocument>, RepositoryError>;

    async fn create(&self, document: &ApprovalDocument) -> Result<(), RepositoryError>;

    /// Conditionally persist a line's new state, guarded on the line's
    /// currently stored status. Returns `false` when the guard fails,
    /// which is how a lost approval race surfaces.
    async fn commit_line(
        &self,
        document_id: &DocumentId,
        line: &ApprovalLine,
        expected_status: &str,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn list_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ShiftAssignment>, RepositoryError>;

    /// Insert respecting the unique `(date, staff, shift)` slot; a
    /// racing duplicate reports [`InsertOutcome::DuplicateSlot`].
    async fn insert(&self, assignment: &ShiftAssignment) -> Result<InsertOutcome, RepositoryError>;
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    /// Approved leaves overlapping the range, or all leaves when no
    /// range is given.
    async fn list(
        &self,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<ApprovedLeave>, RepositoryError>;

    async fn save(&self, leave: &ApprovedLeave) -> Result<(), RepositoryError>;
}

/// Idempotency ledger for bulk roster submissions, keyed by the
/// client-supplied plan key.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn find_by_key(
        &self,
        plan_key: &str,
    ) -> Result<Option<RosterPlanRecord>, RepositoryError>;

    /// Record a plan outcome unless the key is already taken. The
    /// stored record never changes once written; a concurrent writer
    /// that loses gets [`RecordOutcome::AlreadyRecorded`] and must
    /// treat the stored record as authoritative.
    async fn record(&self, record: &RosterPlanRecord) -> Result<RecordOutcome, RepositoryError>;
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("bad timestamp `{raw}`: {error}")))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, RepositoryError> {
    raw.parse()
        .map_err(|error| RepositoryError::Decode(format!("bad date `{raw}`: {error}")))
}
