use sqlx::Row;

use wardline_core::domain::approval::{
    ApprovalDocument, ApprovalLine, ApprovalState, CcState, DocumentId, LineId, LineRole, StaffId,
};

use super::{parse_timestamp, DocumentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlDocumentRepository {
    pool: DbPool,
}

impl SqlDocumentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

struct LineColumns {
    kind: &'static str,
    order: u32,
    status: &'static str,
    acted_at: Option<String>,
    rejection_reason: Option<String>,
}

fn line_columns(line: &ApprovalLine) -> LineColumns {
    match &line.role {
        LineRole::Approval { order, status } => {
            let (acted_at, rejection_reason) = match status {
                ApprovalState::Pending => (None, None),
                ApprovalState::Approved { acted_at } => (Some(acted_at.to_rfc3339()), None),
                ApprovalState::Rejected { acted_at, reason } => {
                    (Some(acted_at.to_rfc3339()), Some(reason.clone()))
                }
            };
            LineColumns {
                kind: "approval",
                order: *order,
                status: status.label(),
                acted_at,
                rejection_reason,
            }
        }
        LineRole::Cc { order, status } => {
            let acted_at = match status {
                CcState::Pending => None,
                CcState::Read { acted_at } => Some(acted_at.to_rfc3339()),
            };
            LineColumns {
                kind: "cc",
                order: *order,
                status: status.label(),
                acted_at,
                rejection_reason: None,
            }
        }
    }
}

fn decode_role(
    kind: &str,
    order: u32,
    status: &str,
    acted_at: Option<&str>,
    rejection_reason: Option<&str>,
) -> Result<LineRole, RepositoryError> {
    let acted = acted_at.map(parse_timestamp).transpose()?;

    match (kind, status) {
        ("approval", "pending") => {
            Ok(LineRole::Approval { order, status: ApprovalState::Pending })
        }
        ("approval", "approved") => {
            let acted_at = acted.ok_or_else(|| {
                RepositoryError::Decode("approved line without acted_at".to_string())
            })?;
            Ok(LineRole::Approval { order, status: ApprovalState::Approved { acted_at } })
        }
        ("approval", "rejected") => {
            let acted_at = acted.ok_or_else(|| {
                RepositoryError::Decode("rejected line without acted_at".to_string())
            })?;
            let reason = rejection_reason.unwrap_or_default().to_string();
            Ok(LineRole::Approval {
                order,
                status: ApprovalState::Rejected { acted_at, reason },
            })
        }
        ("cc", "pending") => Ok(LineRole::Cc { order, status: CcState::Pending }),
        ("cc", "read") => {
            let acted_at = acted.ok_or_else(|| {
                RepositoryError::Decode("read cc line without acted_at".to_string())
            })?;
            Ok(LineRole::Cc { order, status: CcState::Read { acted_at } })
        }
        (kind, status) => Err(RepositoryError::Decode(format!(
            "unknown line encoding kind=`{kind}` status=`{status}`"
        ))),
    }
}

fn row_to_line(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalLine, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_id: String =
        row.try_get("approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_name: String =
        row.try_get("approver_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind: String =
        row.try_get("line_kind").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let order: i64 =
        row.try_get("line_order").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let acted_at: Option<String> =
        row.try_get("acted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let rejection_reason: Option<String> =
        row.try_get("rejection_reason").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let role = decode_role(
        &kind,
        order as u32,
        &status,
        acted_at.as_deref(),
        rejection_reason.as_deref(),
    )?;

    Ok(ApprovalLine {
        id: LineId(id),
        approver_id: StaffId(approver_id),
        approver_name,
        role,
    })
}

#[async_trait::async_trait]
impl DocumentRepository for SqlDocumentRepository {
    async fn find_by_id(
        &self,
        id: &DocumentId,
    ) -> Result<Option<ApprovalDocument>, RepositoryError> {
        let document_row = sqlx::query(
            "SELECT id, requester_id, created_at FROM approval_document WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(document_row) = document_row else {
            return Ok(None);
        };

        let requester_id: String = document_row
            .try_get("requester_id")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let created_at_raw: String = document_row
            .try_get("created_at")
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;

        let line_rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, approver_id, approver_name, line_kind, line_order, status,
                    acted_at, rejection_reason
             FROM approval_line
             WHERE document_id = ?
             ORDER BY line_kind ASC, line_order ASC",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        let lines =
            line_rows.iter().map(row_to_line).collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ApprovalDocument {
            id: id.clone(),
            requester_id: StaffId(requester_id),
            created_at: parse_timestamp(&created_at_raw)?,
            lines,
        }))
    }

    async fn create(&self, document: &ApprovalDocument) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO approval_document (id, requester_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(&document.id.0)
        .bind(&document.requester_id.0)
        .bind(document.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for line in &document.lines {
            let columns = line_columns(line);
            sqlx::query(
                "INSERT INTO approval_line (id, document_id, approver_id, approver_name,
                                            line_kind, line_order, status, acted_at,
                                            rejection_reason)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&line.id.0)
            .bind(&document.id.0)
            .bind(&line.approver_id.0)
            .bind(&line.approver_name)
            .bind(columns.kind)
            .bind(columns.order)
            .bind(columns.status)
            .bind(&columns.acted_at)
            .bind(&columns.rejection_reason)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn commit_line(
        &self,
        document_id: &DocumentId,
        line: &ApprovalLine,
        expected_status: &str,
    ) -> Result<bool, RepositoryError> {
        let columns = line_columns(line);

        // Compare-and-swap on the stored status: a concurrent actor who
        // already moved the line off `expected_status` makes this a
        // zero-row update rather than an overwrite.
        let result = sqlx::query(
            "UPDATE approval_line
             SET status = ?, acted_at = ?, rejection_reason = ?
             WHERE id = ? AND document_id = ? AND status = ?",
        )
        .bind(columns.status)
        .bind(&columns.acted_at)
        .bind(&columns.rejection_reason)
        .bind(&line.id.0)
        .bind(&document_id.0)
        .bind(expected_status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use wardline_core::approvals::{apply_action, create_document, Action, Approver, ApproverDraft};
    use wardline_core::domain::approval::{ApprovalState, LineRole, StaffId};

    use super::SqlDocumentRepository;
    use crate::repositories::DocumentRepository;
    use crate::{connect_memory, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_memory().await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn approver(id: &str) -> Approver {
        Approver { staff_id: StaffId(id.to_string()), name: format!("Nurse {id}") }
    }

    fn sample_document() -> wardline_core::ApprovalDocument {
        let draft = ApproverDraft::new(vec![approver("nurse1"), approver("nurse2")]);
        create_document(
            StaffId("requester".to_string()),
            &draft,
            &[approver("head-nurse")],
            Utc::now(),
        )
        .expect("valid chain")
    }

    #[tokio::test]
    async fn create_and_find_round_trips_lines_and_roles() {
        let pool = setup().await;
        let repo = SqlDocumentRepository::new(pool);
        let document = sample_document();

        repo.create(&document).await.expect("create");
        let found =
            repo.find_by_id(&document.id).await.expect("find").expect("should exist");

        assert_eq!(found.id, document.id);
        assert_eq!(found.requester_id, document.requester_id);
        assert_eq!(found.lines.len(), 3);
        assert_eq!(found.approval_lines().count(), 2);
    }

    #[tokio::test]
    async fn missing_document_is_none() {
        let pool = setup().await;
        let repo = SqlDocumentRepository::new(pool);

        let found = repo
            .find_by_id(&wardline_core::DocumentId("nope".to_string()))
            .await
            .expect("query works");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn commit_line_guards_on_current_status() {
        let pool = setup().await;
        let repo = SqlDocumentRepository::new(pool);
        let document = sample_document();
        repo.create(&document).await.expect("create");

        let first_line_id = document.lines[0].id.clone();
        let acted = apply_action(&document, &first_line_id, Action::Approve, Utc::now())
            .expect("first line actionable");
        let updated_line = acted.line(&first_line_id).unwrap();

        let committed = repo
            .commit_line(&document.id, updated_line, "pending")
            .await
            .expect("commit works");
        assert!(committed);

        // Second commit with the same guard loses: status is no longer
        // pending.
        let committed_again = repo
            .commit_line(&document.id, updated_line, "pending")
            .await
            .expect("commit works");
        assert!(!committed_again);

        let stored = repo
            .find_by_id(&document.id)
            .await
            .expect("find")
            .expect("exists");
        assert!(matches!(
            stored.line(&first_line_id).unwrap().role,
            LineRole::Approval { status: ApprovalState::Approved { .. }, .. }
        ));
    }

    #[tokio::test]
    async fn rejection_reason_round_trips() {
        let pool = setup().await;
        let repo = SqlDocumentRepository::new(pool);
        let document = sample_document();
        repo.create(&document).await.expect("create");

        let first_line_id = document.lines[0].id.clone();
        let acted = apply_action(
            &document,
            &first_line_id,
            Action::Reject { reason: "인력 부족".to_string() },
            Utc::now(),
        )
        .expect("first line actionable");

        let committed = repo
            .commit_line(&document.id, acted.line(&first_line_id).unwrap(), "pending")
            .await
            .expect("commit works");
        assert!(committed);

        let stored = repo
            .find_by_id(&document.id)
            .await
            .expect("find")
            .expect("exists");
        match &stored.line(&first_line_id).unwrap().role {
            LineRole::Approval { status: ApprovalState::Rejected { reason, .. }, .. } => {
                assert_eq!(reason, "인력 부족");
            }
            other => panic!("expected rejected approval line, got {other:?}"),
        }
    }
}
