use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaffId(pub String);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for StaffId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a gating approval step. Terminal variants carry the data
/// that only exists once the step has been acted on, so a pending line
/// cannot hold a rejection reason or an acted-at stamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved { acted_at: DateTime<Utc> },
    Rejected { acted_at: DateTime<Utc>, reason: String },
}

impl ApprovalState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved { .. } => "approved",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// State of a non-gating read-receipt step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CcState {
    Pending,
    Read { acted_at: DateTime<Utc> },
}

impl CcState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Read { .. } => "read",
        }
    }
}

/// Role a line plays on a document. Approval lines gate progression by
/// `order`; cc lines keep an order for display only and never gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineRole {
    Approval { order: u32, status: ApprovalState },
    Cc { order: u32, status: CcState },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLine {
    pub id: LineId,
    pub approver_id: StaffId,
    pub approver_name: String,
    pub role: LineRole,
}

impl ApprovalLine {
    /// Gating order for approval lines, `None` for cc lines.
    pub fn approval_order(&self) -> Option<u32> {
        match &self.role {
            LineRole::Approval { order, .. } => Some(*order),
            LineRole::Cc { .. } => None,
        }
    }

    pub fn approval_state(&self) -> Option<&ApprovalState> {
        match &self.role {
            LineRole::Approval { status, .. } => Some(status),
            LineRole::Cc { .. } => None,
        }
    }
}

/// A workflow document with an ordered approval chain. Created once,
/// mutated only by line-status transitions, never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDocument {
    pub id: DocumentId,
    pub requester_id: StaffId,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<ApprovalLine>,
}

impl ApprovalDocument {
    pub fn line(&self, line_id: &LineId) -> Option<&ApprovalLine> {
        self.lines.iter().find(|line| &line.id == line_id)
    }

    pub fn approval_lines(&self) -> impl Iterator<Item = &ApprovalLine> {
        self.lines.iter().filter(|line| matches!(line.role, LineRole::Approval { .. }))
    }
}

/// Aggregate workflow state, always derived from the line states and
/// never persisted as independent truth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    InProgress,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in_progress" => Some(Self::InProgress),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}
