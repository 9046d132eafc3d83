use serde::Serialize;

use wardline_core::approvals::{self, Action, Approver, ApproverDraft};
use wardline_core::domain::approval::{
    ApprovalDocument, ApprovalState, DocumentId, LineId, LineRole, StaffId,
};
use wardline_db::repositories::SqlDocumentRepository;
use wardline_service::ApprovalService;

use crate::commands::{classify_failure, with_pool, CommandResult};

#[derive(Debug, Serialize)]
struct LineView {
    line_id: String,
    approver_id: String,
    approver_name: String,
    kind: &'static str,
    order: u32,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection_reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct DocumentView {
    document_id: String,
    requester_id: String,
    status: &'static str,
    lines: Vec<LineView>,
}

impl DocumentView {
    fn from_document(document: &ApprovalDocument) -> Self {
        let lines = document
            .lines
            .iter()
            .map(|line| {
                let (kind, order, status, rejection_reason) = match &line.role {
                    LineRole::Approval { order, status } => {
                        let reason = match status {
                            ApprovalState::Rejected { reason, .. } => Some(reason.clone()),
                            _ => None,
                        };
                        ("approval", *order, status.label(), reason)
                    }
                    LineRole::Cc { order, status } => ("cc", *order, status.label(), None),
                };
                LineView {
                    line_id: line.id.0.clone(),
                    approver_id: line.approver_id.0.clone(),
                    approver_name: line.approver_name.clone(),
                    kind,
                    order,
                    status,
                    rejection_reason,
                }
            })
            .collect();

        Self {
            document_id: document.id.0.clone(),
            requester_id: document.requester_id.0.clone(),
            status: approvals::final_status(document).as_str(),
            lines,
        }
    }

    fn render(&self, command: &str) -> CommandResult {
        match serde_json::to_string_pretty(self) {
            Ok(rendered) => CommandResult::success(command, rendered),
            Err(error) => CommandResult::failure(
                command,
                "serialization",
                format!("failed to render document: {error}"),
                7,
            ),
        }
    }
}

fn parse_participant(spec: &str) -> Approver {
    let (id, name) = match spec.split_once(':') {
        Some((id, name)) if !name.trim().is_empty() => (id.trim(), name.trim()),
        Some((id, _)) => (id.trim(), id.trim()),
        None => (spec.trim(), spec.trim()),
    };
    Approver { staff_id: StaffId(id.to_string()), name: name.to_string() }
}

pub fn submit(requester: &str, approver_specs: &[String], cc_specs: &[String]) -> CommandResult {
    let requester_id = StaffId(requester.trim().to_string());
    let draft = ApproverDraft::new(
        approver_specs.iter().map(|spec| parse_participant(spec)).collect(),
    );
    let ccs: Vec<Approver> = cc_specs.iter().map(|spec| parse_participant(spec)).collect();

    with_pool("submit", |pool| async move {
        let service = ApprovalService::new(SqlDocumentRepository::new(pool));
        let document = service
            .create_document(requester_id, &draft, &ccs)
            .await
            .map_err(classify_failure)?;

        Ok(DocumentView::from_document(&document).render("submit"))
    })
}

pub fn status(document_id: &str) -> CommandResult {
    let document_id = DocumentId(document_id.trim().to_string());

    with_pool("status", |pool| async move {
        let service = ApprovalService::new(SqlDocumentRepository::new(pool));
        let document = service.get_document(&document_id).await.map_err(classify_failure)?;

        Ok(DocumentView::from_document(&document).render("status"))
    })
}

pub fn act(document_id: &str, line_id: &str, action: Action) -> CommandResult {
    let command = match &action {
        Action::Approve => "approve",
        Action::Reject { .. } => "reject",
        Action::MarkRead => "mark-read",
    };
    let document_id = DocumentId(document_id.trim().to_string());
    let line_id = LineId(line_id.trim().to_string());

    with_pool(command, |pool| async move {
        let service = ApprovalService::new(SqlDocumentRepository::new(pool));
        let document = service
            .act_on_line(&document_id, &line_id, action)
            .await
            .map_err(classify_failure)?;

        Ok(DocumentView::from_document(&document).render(command))
    })
}

#[cfg(test)]
mod tests {
    use super::parse_participant;

    #[test]
    fn participant_spec_with_name_splits_on_first_colon() {
        let approver = parse_participant("n-200:Head Nurse");
        assert_eq!(approver.staff_id.0, "n-200");
        assert_eq!(approver.name, "Head Nurse");
    }

    #[test]
    fn participant_spec_without_name_uses_id_as_name() {
        let approver = parse_participant("n-200");
        assert_eq!(approver.staff_id.0, "n-200");
        assert_eq!(approver.name, "n-200");
    }

    #[test]
    fn participant_spec_with_empty_name_falls_back_to_id() {
        let approver = parse_participant("n-200: ");
        assert_eq!(approver.staff_id.0, "n-200");
        assert_eq!(approver.name, "n-200");
    }
}
