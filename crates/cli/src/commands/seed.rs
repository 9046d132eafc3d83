use crate::commands::{with_pool, CommandResult};
use wardline_db::{migrations, DemoSeedDataset};

pub fn run() -> CommandResult {
    with_pool("seed", |pool| async move {
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        if !verification.all_present {
            return Err((
                "seed_verification",
                verification_failure_message(&verification.checks),
                6u8,
            ));
        }

        let message = format!(
            "demo dataset loaded: {} approval documents, {} approved leaves, {} assignments",
            seed_result.documents_seeded,
            seed_result.leaves_seeded,
            seed_result.assignments_seeded,
        );
        Ok(CommandResult::success("seed", message))
    })
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
