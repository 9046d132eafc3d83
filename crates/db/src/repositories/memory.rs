use std::collections::HashMap;

use chrono::NaiveDate;
use tokio::sync::RwLock;

use wardline_core::domain::approval::{ApprovalDocument, ApprovalLine, DocumentId, LineRole};
use wardline_core::domain::roster::{ApprovedLeave, ShiftAssignment};

use super::{
    AssignmentRepository, DocumentRepository, InsertOutcome, LeaveRepository, PlanRepository,
    RecordOutcome, RepositoryError, RosterPlanRecord,
};

#[derive(Default)]
pub struct InMemoryDocumentRepository {
    documents: RwLock<HashMap<String, ApprovalDocument>>,
}

fn stored_status_label(role: &LineRole) -> &'static str {
    match role {
        LineRole::Approval { status, .. } => status.label(),
        LineRole::Cc { status, .. } => status.label(),
    }
}

#[async_trait::async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn find_by_id(
        &self,
        id: &DocumentId,
    ) -> Result<Option<ApprovalDocument>, RepositoryError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id.0).cloned())
    }

    async fn create(&self, document: &ApprovalDocument) -> Result<(), RepositoryError> {
        let mut documents = self.documents.write().await;
        documents.insert(document.id.0.clone(), document.clone());
        Ok(())
    }

    async fn commit_line(
        &self,
        document_id: &DocumentId,
        line: &ApprovalLine,
        expected_status: &str,
    ) -> Result<bool, RepositoryError> {
        let mut documents = self.documents.write().await;
        let Some(document) = documents.get_mut(&document_id.0) else {
            return Ok(false);
        };
        let Some(stored) = document.lines.iter_mut().find(|stored| stored.id == line.id) else {
            return Ok(false);
        };
        if stored_status_label(&stored.role) != expected_status {
            return Ok(false);
        }
        stored.role = line.role.clone();
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryAssignmentRepository {
    assignments: RwLock<Vec<ShiftAssignment>>,
}

#[async_trait::async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn list_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ShiftAssignment>, RepositoryError> {
        let assignments = self.assignments.read().await;
        let mut matching: Vec<ShiftAssignment> = assignments
            .iter()
            .filter(|assignment| from <= assignment.date && assignment.date <= to)
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            left.date.cmp(&right.date).then_with(|| left.staff_id.0.cmp(&right.staff_id.0))
        });
        Ok(matching)
    }

    async fn insert(
        &self,
        assignment: &ShiftAssignment,
    ) -> Result<InsertOutcome, RepositoryError> {
        let mut assignments = self.assignments.write().await;
        let duplicate = assignments.iter().any(|stored| {
            stored.date == assignment.date
                && stored.staff_id == assignment.staff_id
                && stored.shift == assignment.shift
        });
        if duplicate {
            return Ok(InsertOutcome::DuplicateSlot);
        }
        assignments.push(assignment.clone());
        Ok(InsertOutcome::Inserted)
    }
}

#[derive(Default)]
pub struct InMemoryLeaveRepository {
    leaves: RwLock<Vec<ApprovedLeave>>,
}

#[async_trait::async_trait]
impl LeaveRepository for InMemoryLeaveRepository {
    async fn list(
        &self,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<ApprovedLeave>, RepositoryError> {
        let leaves = self.leaves.read().await;
        let matching = leaves
            .iter()
            .filter(|leave| match range {
                Some((from, to)) => leave.from_date <= to && leave.to_date >= from,
                None => true,
            })
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn save(&self, leave: &ApprovedLeave) -> Result<(), RepositoryError> {
        let mut leaves = self.leaves.write().await;
        leaves.push(leave.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPlanRepository {
    plans: RwLock<HashMap<String, RosterPlanRecord>>,
}

#[async_trait::async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn find_by_key(
        &self,
        plan_key: &str,
    ) -> Result<Option<RosterPlanRecord>, RepositoryError> {
        let plans = self.plans.read().await;
        Ok(plans.get(plan_key).cloned())
    }

    async fn record(&self, record: &RosterPlanRecord) -> Result<RecordOutcome, RepositoryError> {
        let mut plans = self.plans.write().await;
        if plans.contains_key(&record.plan_key) {
            return Ok(RecordOutcome::AlreadyRecorded);
        }
        plans.insert(record.plan_key.clone(), record.clone());
        Ok(RecordOutcome::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use wardline_core::approvals::{apply_action, create_document, Action, Approver, ApproverDraft};
    use wardline_core::domain::approval::StaffId;
    use wardline_core::domain::roster::{AssignmentId, ShiftAssignment, ShiftKind};

    use crate::repositories::{
        AssignmentRepository, DocumentRepository, InMemoryAssignmentRepository,
        InMemoryDocumentRepository, InMemoryPlanRepository, InsertOutcome, PlanRepository,
        RecordOutcome, RosterPlanRecord,
    };

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date literal")
    }

    #[tokio::test]
    async fn in_memory_document_repo_commit_line_guards_like_sql() {
        let repo = InMemoryDocumentRepository::default();
        let draft = ApproverDraft::new(vec![Approver {
            staff_id: StaffId("nurse1".to_string()),
            name: "Nurse One".to_string(),
        }]);
        let document =
            create_document(StaffId("requester".to_string()), &draft, &[], Utc::now())
                .expect("valid chain");
        repo.create(&document).await.expect("create");

        let line_id = document.lines[0].id.clone();
        let acted = apply_action(&document, &line_id, Action::Approve, Utc::now())
            .expect("actionable");
        let line = acted.line(&line_id).unwrap();

        assert!(repo.commit_line(&document.id, line, "pending").await.expect("commit"));
        assert!(!repo.commit_line(&document.id, line, "pending").await.expect("commit"));
    }

    #[tokio::test]
    async fn in_memory_assignment_repo_rejects_duplicate_slot() {
        let repo = InMemoryAssignmentRepository::default();
        let assignment = ShiftAssignment {
            id: AssignmentId(Uuid::new_v4().to_string()),
            date: date("2025-01-01"),
            staff_id: StaffId("doctor".to_string()),
            staff_name: "Doctor".to_string(),
            dept: "ER".to_string(),
            shift: ShiftKind::Day,
        };

        assert_eq!(repo.insert(&assignment).await.expect("insert"), InsertOutcome::Inserted);

        let mut duplicate = assignment.clone();
        duplicate.id = AssignmentId(Uuid::new_v4().to_string());
        assert_eq!(
            repo.insert(&duplicate).await.expect("insert"),
            InsertOutcome::DuplicateSlot
        );
    }

    #[tokio::test]
    async fn in_memory_plan_repo_keeps_first_record_like_sql() {
        let repo = InMemoryPlanRepository::default();
        let first = RosterPlanRecord {
            plan_key: "plan-1".to_string(),
            request_fingerprint: "fp-a".to_string(),
            outcome_json: "{\"created\":1}".to_string(),
            created_at: Utc::now(),
        };
        let mut second = first.clone();
        second.request_fingerprint = "fp-b".to_string();
        second.outcome_json = "{\"created\":0}".to_string();

        assert_eq!(repo.record(&first).await.expect("record"), RecordOutcome::Recorded);
        assert_eq!(
            repo.record(&second).await.expect("record"),
            RecordOutcome::AlreadyRecorded
        );

        let stored = repo.find_by_key("plan-1").await.expect("find").expect("stored");
        assert_eq!(stored.request_fingerprint, "fp-a");
        assert_eq!(stored.outcome_json, "{\"created\":1}");
    }
}
