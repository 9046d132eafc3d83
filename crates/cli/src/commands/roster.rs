use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use wardline_core::domain::approval::StaffId;
use wardline_core::domain::roster::{ShiftKind, StaffMember};
use wardline_db::repositories::{
    SqlAssignmentRepository, SqlLeaveRepository, SqlPlanRepository,
};
use wardline_db::DbPool;
use wardline_service::{BulkRequest, RosterService};

use crate::commands::{classify_failure, with_pool, CommandResult};

/// On-disk shape of a bulk duty plan.
#[derive(Debug, Deserialize)]
struct PlanFile {
    plan_key: String,
    shift: String,
    dates: Vec<String>,
    staff: Vec<StaffEntry>,
}

#[derive(Debug, Deserialize)]
struct StaffEntry {
    id: String,
    name: Option<String>,
    #[serde(default = "default_dept")]
    dept: String,
}

fn default_dept() -> String {
    "general".to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate, (&'static str, String, u8)> {
    value
        .trim()
        .parse()
        .map_err(|_| ("invalid_argument", format!("not a YYYY-MM-DD date: `{value}`"), 2u8))
}

fn parse_shift(value: &str) -> Result<ShiftKind, (&'static str, String, u8)> {
    ShiftKind::parse(value).ok_or_else(|| {
        ("invalid_argument", format!("unknown shift kind `{value}` (expected day|night)"), 2u8)
    })
}

fn roster_service(
    pool: DbPool,
) -> RosterService<SqlAssignmentRepository, SqlLeaveRepository, SqlPlanRepository> {
    RosterService::new(
        SqlAssignmentRepository::new(pool.clone()),
        SqlLeaveRepository::new(pool.clone()),
        SqlPlanRepository::new(pool),
    )
}

fn render_json<T: serde::Serialize>(command: &str, value: &T) -> CommandResult {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => CommandResult::success(command, rendered),
        Err(error) => CommandResult::failure(
            command,
            "serialization",
            format!("failed to render output: {error}"),
            7,
        ),
    }
}

pub fn assign(
    date: &str,
    staff_id: &str,
    name: Option<&str>,
    dept: &str,
    shift: &str,
) -> CommandResult {
    let staff = StaffMember {
        id: StaffId(staff_id.trim().to_string()),
        name: name.unwrap_or(staff_id).trim().to_string(),
        dept: dept.trim().to_string(),
    };
    let date_arg = date.to_string();
    let shift_arg = shift.to_string();

    with_pool("assign", |pool| async move {
        let date = parse_date(&date_arg)?;
        let shift = parse_shift(&shift_arg)?;

        let created = roster_service(pool)
            .create_assignment(date, &staff, shift)
            .await
            .map_err(classify_failure)?;

        Ok(render_json("assign", &created))
    })
}

pub fn plan(file: &Path) -> CommandResult {
    let raw = match fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                "plan",
                "plan_file",
                format!("could not read `{}`: {error}", file.display()),
                2,
            );
        }
    };
    let plan_file: PlanFile = match toml::from_str(&raw) {
        Ok(plan_file) => plan_file,
        Err(error) => {
            return CommandResult::failure(
                "plan",
                "plan_file",
                format!("could not parse `{}`: {error}", file.display()),
                2,
            );
        }
    };

    with_pool("plan", |pool| async move {
        let shift = parse_shift(&plan_file.shift)?;
        let mut dates = Vec::with_capacity(plan_file.dates.len());
        for value in &plan_file.dates {
            dates.push(parse_date(value)?);
        }
        let pool_members: Vec<StaffMember> = plan_file
            .staff
            .iter()
            .map(|entry| StaffMember {
                id: StaffId(entry.id.trim().to_string()),
                name: entry.name.as_deref().unwrap_or(&entry.id).trim().to_string(),
                dept: entry.dept.trim().to_string(),
            })
            .collect();

        let request = BulkRequest {
            plan_key: plan_file.plan_key.trim().to_string(),
            dates,
            shift,
            pool: pool_members,
        };
        let outcome =
            roster_service(pool).bulk_assign(&request).await.map_err(classify_failure)?;

        Ok(render_json("plan", &outcome))
    })
}

pub fn list(from: &str, to: &str) -> CommandResult {
    let from_arg = from.to_string();
    let to_arg = to.to_string();

    with_pool("roster", |pool| async move {
        let from = parse_date(&from_arg)?;
        let to = parse_date(&to_arg)?;
        if from > to {
            return Err((
                "invalid_argument",
                format!("range start {from} is after range end {to}"),
                2u8,
            ));
        }

        let assignments =
            roster_service(pool).list_assignments(from, to).await.map_err(classify_failure)?;

        Ok(render_json("roster", &assignments))
    })
}

pub fn leaves(from: Option<&str>, to: Option<&str>) -> CommandResult {
    let from_arg = from.map(str::to_string);
    let to_arg = to.map(str::to_string);

    with_pool("leaves", |pool| async move {
        let range = match (from_arg, to_arg) {
            (Some(from), Some(to)) => Some((parse_date(&from)?, parse_date(&to)?)),
            _ => None,
        };

        let leaves = roster_service(pool).list_leaves(range).await.map_err(classify_failure)?;

        Ok(render_json("leaves", &leaves))
    })
}

#[cfg(test)]
mod tests {
    use super::PlanFile;

    #[test]
    fn plan_file_parses_with_defaulted_dept() {
        let raw = r#"
            plan_key = "ward-a-2025-02"
            shift = "night"
            dates = ["2025-02-01", "2025-02-02"]

            [[staff]]
            id = "n-100"
            name = "Kim"
            dept = "ER"

            [[staff]]
            id = "n-200"
        "#;

        let plan: PlanFile = toml::from_str(raw).expect("parse plan file");
        assert_eq!(plan.plan_key, "ward-a-2025-02");
        assert_eq!(plan.dates.len(), 2);
        assert_eq!(plan.staff[0].dept, "ER");
        assert_eq!(plan.staff[1].dept, "general");
        assert!(plan.staff[1].name.is_none());
    }
}
