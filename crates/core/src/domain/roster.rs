use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::approval::StaffId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub String);

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftKind {
    Day,
    Night,
}

impl ShiftKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Night => "night",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "day" => Some(Self::Day),
            "night" => Some(Self::Night),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveKind {
    Annual,
    Sick,
    Official,
    Maternity,
    Other,
}

impl LeaveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Sick => "sick",
            Self::Official => "official",
            Self::Maternity => "maternity",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "annual" => Some(Self::Annual),
            "sick" => Some(Self::Sick),
            "official" => Some(Self::Official),
            "maternity" => Some(Self::Maternity),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for LeaveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A staff member eligible for duty allocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub name: String,
    pub dept: String,
}

/// One staff member covering one shift on one date. Immutable once
/// created; no two assignments may share `(date, staff_id, shift)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    pub id: AssignmentId,
    pub date: NaiveDate,
    pub staff_id: StaffId,
    pub staff_name: String,
    pub dept: String,
    pub shift: ShiftKind,
}

/// Outcome of an approved leave request, consumed read-only by the
/// roster allocator. Both endpoints are inclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedLeave {
    pub staff_id: StaffId,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub kind: LeaveKind,
}

impl ApprovedLeave {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.from_date <= date && date <= self.to_date
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{ApprovedLeave, LeaveKind, ShiftKind};
    use crate::domain::approval::StaffId;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date literal")
    }

    #[test]
    fn shift_kind_round_trips_from_storage_encoding() {
        for shift in [ShiftKind::Day, ShiftKind::Night] {
            assert_eq!(ShiftKind::parse(shift.as_str()), Some(shift));
        }
    }

    #[test]
    fn leave_kind_round_trips_from_storage_encoding() {
        let cases = [
            LeaveKind::Annual,
            LeaveKind::Sick,
            LeaveKind::Official,
            LeaveKind::Maternity,
            LeaveKind::Other,
        ];

        for kind in cases {
            assert_eq!(LeaveKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn leave_covers_both_endpoints_inclusive() {
        let leave = ApprovedLeave {
            staff_id: StaffId("n-1".to_string()),
            from_date: date("2025-01-02"),
            to_date: date("2025-01-04"),
            kind: LeaveKind::Annual,
        };

        assert!(!leave.covers(date("2025-01-01")));
        assert!(leave.covers(date("2025-01-02")));
        assert!(leave.covers(date("2025-01-03")));
        assert!(leave.covers(date("2025-01-04")));
        assert!(!leave.covers(date("2025-01-05")));
    }
}
