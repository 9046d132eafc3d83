//! Approval chain evaluation.
//!
//! Pure functions over an [`ApprovalDocument`] snapshot: which line is
//! actionable, what the aggregate status is, and how a document changes
//! when an approver acts. No I/O happens here; persisting the returned
//! document and re-validating against stored state at commit time is
//! the orchestration layer's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::approval::{
    ApprovalDocument, ApprovalLine, ApprovalState, CcState, DocumentId, DocumentStatus, LineId,
    LineRole, StaffId,
};
use crate::errors::{TransitionError, ValidationError};

/// An entry in a draft approval chain, before line ids and orders are
/// assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub staff_id: StaffId,
    pub name: String,
}

/// Ordered approver sequence for a document under construction.
///
/// Reordering returns a new sequence instead of splicing in place, so
/// a failed move leaves the draft untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApproverDraft {
    entries: Vec<Approver>,
}

impl ApproverDraft {
    pub fn new(entries: Vec<Approver>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Approver] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move the entry at `from` so it ends up at position `to`,
    /// shifting the entries in between.
    pub fn move_approver(&self, from: usize, to: usize) -> Result<Self, ValidationError> {
        let len = self.entries.len();
        if from >= len || to >= len {
            return Err(ValidationError::MoveOutOfBounds { from, to, len });
        }

        let mut entries = self.entries.clone();
        let entry = entries.remove(from);
        entries.insert(to, entry);
        Ok(Self { entries })
    }
}

/// What an actor wants to do to a line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Approve,
    Reject { reason: String },
    MarkRead,
}

impl Action {
    fn label(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject { .. } => "reject",
            Self::MarkRead => "mark_read",
        }
    }
}

/// Build a document from a draft chain. Approval lines get contiguous
/// 1-based orders in draft order; cc lines get display orders the same
/// way but never gate.
pub fn create_document(
    requester_id: StaffId,
    approvers: &ApproverDraft,
    ccs: &[Approver],
    created_at: DateTime<Utc>,
) -> Result<ApprovalDocument, ValidationError> {
    if approvers.is_empty() {
        return Err(ValidationError::ApproverRequired);
    }

    let mut lines = Vec::with_capacity(approvers.entries().len() + ccs.len());
    for (index, approver) in approvers.entries().iter().enumerate() {
        lines.push(ApprovalLine {
            id: LineId(Uuid::new_v4().to_string()),
            approver_id: approver.staff_id.clone(),
            approver_name: approver.name.clone(),
            role: LineRole::Approval {
                order: index as u32 + 1,
                status: ApprovalState::Pending,
            },
        });
    }
    for (index, cc) in ccs.iter().enumerate() {
        lines.push(ApprovalLine {
            id: LineId(Uuid::new_v4().to_string()),
            approver_id: cc.staff_id.clone(),
            approver_name: cc.name.clone(),
            role: LineRole::Cc { order: index as u32 + 1, status: CcState::Pending },
        });
    }

    Ok(ApprovalDocument {
        id: DocumentId(Uuid::new_v4().to_string()),
        requester_id,
        created_at,
        lines,
    })
}

/// Strict sequential gating: an approval line is actionable iff it is
/// pending, every lower-order approval line is approved, and no
/// approval line anywhere on the document is rejected.
pub fn can_act(document: &ApprovalDocument, line_id: &LineId) -> bool {
    let Some(line) = document.line(line_id) else {
        return false;
    };
    let LineRole::Approval { order, status } = &line.role else {
        return false;
    };
    if !status.is_pending() {
        return false;
    }

    blocking_reason(document, *order).is_none()
}

fn blocking_reason(document: &ApprovalDocument, order: u32) -> Option<String> {
    for line in document.approval_lines() {
        match &line.role {
            LineRole::Approval { status: ApprovalState::Rejected { .. }, .. } => {
                return Some(format!(
                    "document already rejected by `{}`",
                    line.approver_id
                ));
            }
            LineRole::Approval { order: other, status } if *other < order => {
                if status.is_pending() {
                    return Some(format!(
                        "waiting on approval line {other} (`{}`)",
                        line.approver_id
                    ));
                }
            }
            _ => {}
        }
    }
    None
}

/// Derive the aggregate status. Rejected wins over everything; approved
/// requires every approval line approved; cc lines never count.
pub fn final_status(document: &ApprovalDocument) -> DocumentStatus {
    let mut saw_approval_line = false;
    let mut all_approved = true;

    for line in document.approval_lines() {
        saw_approval_line = true;
        match line.approval_state() {
            Some(ApprovalState::Rejected { .. }) => return DocumentStatus::Rejected,
            Some(ApprovalState::Approved { .. }) => {}
            _ => all_approved = false,
        }
    }

    if saw_approval_line && all_approved {
        DocumentStatus::Approved
    } else {
        DocumentStatus::InProgress
    }
}

/// Apply an action to a line, returning a new document snapshot.
///
/// A rejection freezes downstream approval lines permanently in
/// pending; they become unreachable rather than auto-rejected, which
/// preserves the record that they were never reached.
pub fn apply_action(
    document: &ApprovalDocument,
    line_id: &LineId,
    action: Action,
    now: DateTime<Utc>,
) -> Result<ApprovalDocument, TransitionError> {
    let Some(line) = document.line(line_id) else {
        return Err(TransitionError::LineNotFound {
            document_id: document.id.clone(),
            line_id: line_id.clone(),
        });
    };

    let new_role = match (&line.role, &action) {
        (LineRole::Approval { order, status }, Action::Approve | Action::Reject { .. }) => {
            if !status.is_pending() {
                return Err(TransitionError::AlreadyActed {
                    line_id: line_id.clone(),
                    status: status.label(),
                });
            }
            if let Some(reason) = blocking_reason(document, *order) {
                return Err(TransitionError::NotActionable {
                    line_id: line_id.clone(),
                    reason,
                });
            }
            let new_status = match action {
                Action::Approve => ApprovalState::Approved { acted_at: now },
                Action::Reject { reason } => {
                    ApprovalState::Rejected { acted_at: now, reason }
                }
                Action::MarkRead => unreachable!("matched above"),
            };
            LineRole::Approval { order: *order, status: new_status }
        }
        (LineRole::Cc { order, status }, Action::MarkRead) => match status {
            CcState::Pending => {
                LineRole::Cc { order: *order, status: CcState::Read { acted_at: now } }
            }
            CcState::Read { .. } => {
                return Err(TransitionError::AlreadyActed {
                    line_id: line_id.clone(),
                    status: status.label(),
                });
            }
        },
        (LineRole::Approval { .. }, Action::MarkRead) => {
            return Err(TransitionError::ActionKindMismatch {
                line_id: line_id.clone(),
                kind: "approval",
                action: action.label(),
            });
        }
        (LineRole::Cc { .. }, Action::Approve | Action::Reject { .. }) => {
            return Err(TransitionError::ActionKindMismatch {
                line_id: line_id.clone(),
                kind: "cc",
                action: action.label(),
            });
        }
    };

    let mut updated = document.clone();
    for candidate in &mut updated.lines {
        if &candidate.id == line_id {
            candidate.role = new_role;
            break;
        }
    }
    Ok(updated)
}
