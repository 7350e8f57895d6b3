use crate::commands::{prepare, CommandResult};
use hrflow_db::{connect_with_config, migrations, DemoOrgChart};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seeded = DemoOrgChart::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoOrgChart::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let failed: Vec<&str> = verification
            .checks
            .iter()
            .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
            .collect();
        let outcome = if verification.all_present {
            Ok(seeded.actors_seeded)
        } else {
            Err(("seed_verification", verification_failure_message(&failed), 6u8))
        };

        pool.close().await;
        outcome
    });

    match result {
        Ok(actors) => CommandResult::success_with(
            "seed",
            format!("demo org chart loaded: {} actors", actors.len()),
            Some(serde_json::json!({ "actors": actors })),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_failure_message(failed: &[&str]) -> String {
    if failed.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed.join(", "))
    }
}
