use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wardline_core::domain::approval::StaffId;
use wardline_core::domain::roster::{
    ApprovedLeave, AssignmentId, ShiftAssignment, ShiftKind, StaffMember,
};
use wardline_core::errors::{ApplicationError, ConflictError, DomainError, ValidationError};
use wardline_core::roster::{check_assignment, plan_bulk};
use wardline_db::repositories::{
    AssignmentRepository, InsertOutcome, LeaveRepository, PlanRepository, RecordOutcome,
    RosterPlanRecord,
};

/// A bulk submission request. `plan_key` is the client-supplied
/// idempotency key for the whole plan: retrying with the same key
/// replays the recorded outcome instead of double-booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkRequest {
    pub plan_key: String,
    pub dates: Vec<NaiveDate>,
    pub shift: ShiftKind,
    pub pool: Vec<StaffMember>,
}

impl BulkRequest {
    /// Canonical serialization used to detect a plan key reused for a
    /// different request.
    fn fingerprint(&self) -> String {
        let mut dates = self.dates.clone();
        dates.sort_unstable();
        dates.dedup();
        let staff_ids: Vec<&str> = self.pool.iter().map(|member| member.id.0.as_str()).collect();
        serde_json::json!({
            "dates": dates,
            "shift": self.shift.as_str(),
            "staff": staff_ids,
        })
        .to_string()
    }
}

/// One planned entry that could not be persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAssignment {
    pub date: NaiveDate,
    pub staff_id: StaffId,
    pub reason: String,
}

/// Exact result of a bulk submission: what was persisted, what the
/// allocator could not place, and what failed at commit time. The
/// three sets are disjoint and cover every requested date.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub created: Vec<ShiftAssignment>,
    pub skipped_dates: Vec<NaiveDate>,
    pub failed: Vec<FailedAssignment>,
    /// True when this outcome was replayed from the idempotency ledger
    /// rather than produced by a fresh submission.
    #[serde(default)]
    pub replayed: bool,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct RosterService<A, L, P> {
    assignments: A,
    leaves: L,
    plans: P,
}

impl<A, L, P> RosterService<A, L, P>
where
    A: AssignmentRepository,
    L: LeaveRepository,
    P: PlanRepository,
{
    pub fn new(assignments: A, leaves: L, plans: P) -> Self {
        Self { assignments, leaves, plans }
    }

    /// Create one assignment, re-checking eligibility against the
    /// authoritative stored state at commit time. The unique slot
    /// index closes the remaining race window: a duplicate that lands
    /// between the check and the insert comes back as
    /// [`InsertOutcome::DuplicateSlot`] and is reported as a conflict.
    pub async fn create_assignment(
        &self,
        date: NaiveDate,
        staff: &StaffMember,
        shift: ShiftKind,
    ) -> Result<ShiftAssignment, ApplicationError> {
        let existing = self
            .assignments
            .list_in_range(date, date)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        let leaves = self
            .leaves
            .list(Some((date, date)))
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

        check_assignment(date, &staff.id, shift, &existing, &leaves)
            .map_err(DomainError::from)?;

        let assignment = new_assignment(date, staff, shift);
        let outcome = self
            .assignments
            .insert(&assignment)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

        match outcome {
            InsertOutcome::Inserted => {
                tracing::info!(
                    event_name = "roster.assignment.created",
                    staff_id = %assignment.staff_id,
                    date = %assignment.date,
                    shift = %assignment.shift,
                    "shift assignment created"
                );
                Ok(assignment)
            }
            InsertOutcome::DuplicateSlot => Err(DomainError::from(ConflictError::Duplicate {
                staff_id: staff.id.clone(),
                date,
                shift,
            })
            .into()),
        }
    }

    /// Plan and persist a round-robin bulk allocation.
    ///
    /// The whole call is idempotent under `plan_key`: a retry replays
    /// the recorded outcome, and a key reused for a different request
    /// is rejected. Per-item persistence failures do not abort the
    /// rest of the batch; they are collected so the caller can retry
    /// exactly the failed subset.
    pub async fn bulk_assign(
        &self,
        request: &BulkRequest,
    ) -> Result<BulkOutcome, ApplicationError> {
        if request.pool.is_empty() {
            return Err(DomainError::from(ValidationError::EmptyStaffPool).into());
        }

        let fingerprint = request.fingerprint();
        if let Some(record) = self
            .plans
            .find_by_key(&request.plan_key)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?
        {
            if record.request_fingerprint != fingerprint {
                return Err(DomainError::from(ValidationError::PlanKeyReuse {
                    plan_key: request.plan_key.clone(),
                })
                .into());
            }
            let mut outcome = decode_recorded_outcome(&record)?;
            outcome.replayed = true;
            tracing::info!(
                event_name = "roster.bulk.replayed",
                plan_key = %request.plan_key,
                created = outcome.created.len(),
                "bulk plan outcome replayed from ledger"
            );
            return Ok(outcome);
        }

        let (existing, leaves) = match date_bounds(&request.dates) {
            Some((from, to)) => {
                let existing = self
                    .assignments
                    .list_in_range(from, to)
                    .await
                    .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
                let leaves = self
                    .leaves
                    .list(Some((from, to)))
                    .await
                    .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
                (existing, leaves)
            }
            None => (Vec::new(), Vec::new()),
        };

        let plan = plan_bulk(&request.dates, request.shift, &request.pool, &existing, &leaves);

        let mut outcome = BulkOutcome {
            skipped_dates: plan.skipped_dates,
            ..BulkOutcome::default()
        };
        for planned in &plan.planned {
            let assignment = new_assignment(planned.date, &planned.staff, request.shift);
            match self.assignments.insert(&assignment).await {
                Ok(InsertOutcome::Inserted) => outcome.created.push(assignment),
                Ok(InsertOutcome::DuplicateSlot) => outcome.failed.push(FailedAssignment {
                    date: planned.date,
                    staff_id: planned.staff.id.clone(),
                    reason: "slot already taken by a concurrent writer".to_string(),
                }),
                Err(error) => outcome.failed.push(FailedAssignment {
                    date: planned.date,
                    staff_id: planned.staff.id.clone(),
                    reason: error.to_string(),
                }),
            }
        }

        let record = RosterPlanRecord {
            plan_key: request.plan_key.clone(),
            request_fingerprint: fingerprint,
            outcome_json: serde_json::to_string(&outcome).map_err(|error| {
                ApplicationError::Persistence(format!("plan outcome not serializable: {error}"))
            })?,
            created_at: Utc::now(),
        };
        let recorded = self
            .plans
            .record(&record)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        if recorded == RecordOutcome::AlreadyRecorded {
            // Lost the ledger race to a concurrent submission with the
            // same key. The stored record is authoritative; replay it.
            let stored = self
                .plans
                .find_by_key(&request.plan_key)
                .await
                .map_err(|error| ApplicationError::Persistence(error.to_string()))?
                .ok_or_else(|| {
                    ApplicationError::Persistence(format!(
                        "plan ledger entry for `{}` vanished after a lost write",
                        request.plan_key
                    ))
                })?;
            if stored.request_fingerprint != record.request_fingerprint {
                return Err(DomainError::from(ValidationError::PlanKeyReuse {
                    plan_key: request.plan_key.clone(),
                })
                .into());
            }
            let mut stored_outcome = decode_recorded_outcome(&stored)?;
            stored_outcome.replayed = true;
            tracing::warn!(
                event_name = "roster.bulk.ledger_race_lost",
                plan_key = %request.plan_key,
                "lost plan ledger race; replaying the recorded outcome"
            );
            return Ok(stored_outcome);
        }

        if outcome.is_complete() {
            tracing::info!(
                event_name = "roster.bulk.submitted",
                plan_key = %request.plan_key,
                created = outcome.created.len(),
                skipped = outcome.skipped_dates.len(),
                "bulk plan submitted"
            );
        } else {
            tracing::warn!(
                event_name = "roster.bulk.partial",
                plan_key = %request.plan_key,
                created = outcome.created.len(),
                failed = outcome.failed.len(),
                "bulk plan submitted with failures"
            );
        }

        Ok(outcome)
    }

    pub async fn list_assignments(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ShiftAssignment>, ApplicationError> {
        self.assignments
            .list_in_range(from, to)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))
    }

    pub async fn list_leaves(
        &self,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<ApprovedLeave>, ApplicationError> {
        self.leaves
            .list(range)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))
    }
}

fn decode_recorded_outcome(record: &RosterPlanRecord) -> Result<BulkOutcome, ApplicationError> {
    serde_json::from_str(&record.outcome_json).map_err(|error| {
        ApplicationError::Persistence(format!("recorded plan outcome is unreadable: {error}"))
    })
}

fn new_assignment(date: NaiveDate, staff: &StaffMember, shift: ShiftKind) -> ShiftAssignment {
    ShiftAssignment {
        id: AssignmentId(Uuid::new_v4().to_string()),
        date,
        staff_id: staff.id.clone(),
        staff_name: staff.name.clone(),
        dept: staff.dept.clone(),
        shift,
    }
}

fn date_bounds(dates: &[NaiveDate]) -> Option<(NaiveDate, NaiveDate)> {
    let from = dates.iter().min()?;
    let to = dates.iter().max()?;
    Some((*from, *to))
}
