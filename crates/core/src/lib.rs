pub mod approvals;
pub mod config;
pub mod domain;
pub mod errors;
pub mod roster;

pub use approvals::{
    apply_action, can_act, create_document, final_status, Action, Approver, ApproverDraft,
};
pub use domain::approval::{
    ApprovalDocument, ApprovalLine, ApprovalState, CcState, DocumentId, DocumentStatus, LineId,
    LineRole, StaffId,
};
pub use domain::roster::{
    ApprovedLeave, AssignmentId, LeaveKind, ShiftAssignment, ShiftKind, StaffMember,
};
pub use errors::{
    ApplicationError, ConflictError, DomainError, InterfaceError, TransitionError, ValidationError,
};
pub use roster::{check_assignment, plan_bulk, BulkPlan, PlannedAssignment};
