//! Deterministic demo fixtures for local development and smoke runs.

use chrono::{NaiveDate, Utc};
use sqlx::Row;
use uuid::Uuid;

use wardline_core::approvals::{create_document, Approver, ApproverDraft};
use wardline_core::domain::approval::StaffId;
use wardline_core::domain::roster::{
    ApprovedLeave, AssignmentId, LeaveKind, ShiftAssignment, ShiftKind,
};

use crate::repositories::{
    AssignmentRepository, DocumentRepository, LeaveRepository, RepositoryError,
    SqlAssignmentRepository, SqlDocumentRepository, SqlLeaveRepository,
};
use crate::DbPool;

#[derive(Clone, Debug)]
pub struct SeedResult {
    pub documents_seeded: usize,
    pub leaves_seeded: usize,
    pub assignments_seeded: usize,
}

#[derive(Clone, Debug)]
pub struct SeedVerification {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let documents = SqlDocumentRepository::new(pool.clone());
        let leaves = SqlLeaveRepository::new(pool.clone());
        let assignments = SqlAssignmentRepository::new(pool.clone());

        let draft = ApproverDraft::new(vec![
            Approver {
                staff_id: StaffId("nurse-lee".to_string()),
                name: "Charge Nurse Lee".to_string(),
            },
            Approver {
                staff_id: StaffId("dr-park".to_string()),
                name: "Dr. Park".to_string(),
            },
        ]);
        let document = create_document(
            StaffId("nurse-kim".to_string()),
            &draft,
            &[Approver {
                staff_id: StaffId("admin-choi".to_string()),
                name: "Ward Admin Choi".to_string(),
            }],
            Utc::now(),
        )
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        documents.create(&document).await?;

        let leave = ApprovedLeave {
            staff_id: StaffId("nurse-kim".to_string()),
            from_date: demo_date(2025, 1, 6),
            to_date: demo_date(2025, 1, 8),
            kind: LeaveKind::Annual,
        };
        leaves.save(&leave).await?;

        let seeded_assignments = [
            demo_assignment(demo_date(2025, 1, 6), "dr-park", "Dr. Park", ShiftKind::Day),
            demo_assignment(
                demo_date(2025, 1, 6),
                "nurse-lee",
                "Charge Nurse Lee",
                ShiftKind::Night,
            ),
        ];
        for assignment in &seeded_assignments {
            assignments.insert(assignment).await?;
        }

        Ok(SeedResult {
            documents_seeded: 1,
            leaves_seeded: 1,
            assignments_seeded: seeded_assignments.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<SeedVerification, RepositoryError> {
        let checks = vec![
            ("approval-documents", count(pool, "approval_document").await? >= 1),
            ("approval-lines", count(pool, "approval_line").await? >= 3),
            ("approved-leaves", count(pool, "approved_leave").await? >= 1),
            ("shift-assignments", count(pool, "shift_assignment").await? >= 2),
        ];
        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(SeedVerification { all_present, checks })
    }
}

fn demo_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn demo_assignment(date: NaiveDate, id: &str, name: &str, shift: ShiftKind) -> ShiftAssignment {
    ShiftAssignment {
        id: AssignmentId(Uuid::new_v4().to_string()),
        date,
        staff_id: StaffId(id.to_string()),
        staff_name: name.to_string(),
        dept: "ER".to_string(),
        shift,
    }
}

async fn count(pool: &DbPool, table: &str) -> Result<i64, RepositoryError> {
    let query = format!("SELECT COUNT(*) AS count FROM {table}");
    let row = sqlx::query(&query).fetch_one(pool).await?;
    row.try_get("count").map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::DemoSeedDataset;
    use crate::{connect_memory, migrations};

    #[tokio::test]
    async fn seed_loads_and_verifies() {
        let pool = connect_memory().await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let result = DemoSeedDataset::load(&pool).await.expect("seed");
        assert_eq!(result.documents_seeded, 1);
        assert_eq!(result.assignments_seeded, 2);

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);
    }
}
