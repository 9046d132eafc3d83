//! Orchestration between the pure scheduling core and persistence.
//!
//! The core decides; this layer re-validates against authoritative
//! stored state at commit time and persists the result. All the
//! time-of-check/time-of-use windows are closed here, either by
//! conditional updates (approval lines) or by the unique assignment
//! slot index (rosters).

pub mod approvals;
pub mod roster;

pub use approvals::ApprovalService;
pub use roster::{BulkOutcome, BulkRequest, FailedAssignment, RosterService};
