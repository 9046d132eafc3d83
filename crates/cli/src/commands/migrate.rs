use wardline_db::migrations;

use crate::commands::{with_pool, CommandResult};

pub fn run() -> CommandResult {
    with_pool("migrate", |pool| async move {
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let ready = migrations::schema_ready(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        if !ready {
            return Err((
                "migration",
                "migrations ran but the schema is still incomplete".to_string(),
                5u8,
            ));
        }

        let applied = migrations::applied_migrations(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        Ok(CommandResult::success("migrate", summarize_applied(&applied)))
    })
}

fn summarize_applied(applied: &[String]) -> String {
    if applied.is_empty() {
        return "schema up to date (no migrations recorded)".to_string();
    }
    format!("schema up to date ({} applied): {}", applied.len(), applied.join(", "))
}

#[cfg(test)]
mod tests {
    use super::summarize_applied;

    #[test]
    fn summary_lists_applied_migrations() {
        let applied = vec!["0001 schedule core".to_string()];
        assert_eq!(
            summarize_applied(&applied),
            "schema up to date (1 applied): 0001 schedule core"
        );
    }

    #[test]
    fn summary_handles_an_empty_ledger() {
        assert_eq!(summarize_applied(&[]), "schema up to date (no migrations recorded)");
    }
}
