use chrono::Utc;

use wardline_core::approvals::{self, Action, Approver, ApproverDraft};
use wardline_core::domain::approval::{
    ApprovalDocument, DocumentId, DocumentStatus, LineId, LineRole, StaffId,
};
use wardline_core::errors::{ApplicationError, DomainError, TransitionError};
use wardline_db::repositories::DocumentRepository;

pub struct ApprovalService<R> {
    documents: R,
}

impl<R> ApprovalService<R>
where
    R: DocumentRepository,
{
    pub fn new(documents: R) -> Self {
        Self { documents }
    }

    pub async fn create_document(
        &self,
        requester_id: StaffId,
        approvers: &ApproverDraft,
        ccs: &[Approver],
    ) -> Result<ApprovalDocument, ApplicationError> {
        let document = approvals::create_document(requester_id, approvers, ccs, Utc::now())
            .map_err(DomainError::from)?;

        self.documents
            .create(&document)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

        tracing::info!(
            event_name = "approval.document.created",
            document_id = %document.id,
            approval_lines = document.approval_lines().count(),
            "approval document created"
        );
        Ok(document)
    }

    /// Apply an action and commit it against the latest stored state.
    ///
    /// The document is re-fetched and the gating rules re-evaluated
    /// here, not trusted from the caller's snapshot. The line update
    /// itself is conditional on the stored status, so of two
    /// concurrent actors exactly one commits and the other gets a
    /// transition error.
    pub async fn act_on_line(
        &self,
        document_id: &DocumentId,
        line_id: &LineId,
        action: Action,
    ) -> Result<ApprovalDocument, ApplicationError> {
        let stored = self
            .documents
            .find_by_id(document_id)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?
            .ok_or_else(|| {
                DomainError::from(TransitionError::DocumentNotFound {
                    document_id: document_id.clone(),
                })
            })?;

        let updated = approvals::apply_action(&stored, line_id, action, Utc::now())
            .map_err(DomainError::from)?;
        let updated_line = updated.line(line_id).ok_or_else(|| {
            DomainError::from(TransitionError::LineNotFound {
                document_id: document_id.clone(),
                line_id: line_id.clone(),
            })
        })?;

        // Every legal action starts from a pending line; that is the
        // compare-and-swap guard.
        let committed = self
            .documents
            .commit_line(document_id, updated_line, "pending")
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

        if !committed {
            tracing::warn!(
                event_name = "approval.line.race_lost",
                document_id = %document_id,
                line_id = %line_id,
                "conditional line update matched no rows"
            );
            return Err(DomainError::from(TransitionError::LostRace {
                document_id: document_id.clone(),
                line_id: line_id.clone(),
            })
            .into());
        }

        tracing::info!(
            event_name = "approval.line.acted",
            document_id = %document_id,
            line_id = %line_id,
            status = line_status_label(&updated_line.role),
            "approval line transitioned"
        );
        Ok(updated)
    }

    pub async fn get_document(
        &self,
        document_id: &DocumentId,
    ) -> Result<ApprovalDocument, ApplicationError> {
        self.documents
            .find_by_id(document_id)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?
            .ok_or_else(|| {
                DomainError::from(TransitionError::DocumentNotFound {
                    document_id: document_id.clone(),
                })
                .into()
            })
    }

    /// Aggregate status, always derived fresh from the stored lines.
    pub async fn document_status(
        &self,
        document_id: &DocumentId,
    ) -> Result<DocumentStatus, ApplicationError> {
        let document = self.get_document(document_id).await?;
        Ok(approvals::final_status(&document))
    }
}

fn line_status_label(role: &LineRole) -> &'static str {
    match role {
        LineRole::Approval { status, .. } => status.label(),
        LineRole::Cc { status, .. } => status.label(),
    }
}
