use std::collections::HashSet;

use hrflow_core::config::{AppConfig, LoadOptions};
use hrflow_core::domain::actor::Role;
use hrflow_core::workflow::{ActorDirectory, HierarchyResolver, HierarchyWalk};
use hrflow_db::{connect_with_config, migrations::MIGRATOR, DbPool, SqlActorDirectory};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, because: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {because}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.extend(database_checks(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            for name in ["database_connectivity", "schema_migrations", "org_chart_integrity"] {
                checks.push(DoctorCheck::skipped(name, "configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn database_checks(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to initialize async runtime: {error}"),
                ),
                DoctorCheck::skipped("schema_migrations", "no async runtime"),
                DoctorCheck::skipped("org_chart_integrity", "no async runtime"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck::fail(
                        "database_connectivity",
                        format!("failed to connect to database: {error}"),
                    ),
                    DoctorCheck::skipped("schema_migrations", "the database is unreachable"),
                    DoctorCheck::skipped("org_chart_integrity", "the database is unreachable"),
                ];
            }
        };

        let mut checks = vec![DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        )];
        let schema = check_schema(&pool).await;
        let schema_ready = schema.status == CheckStatus::Pass;
        checks.push(schema);
        if schema_ready {
            checks.push(check_org_chart(&pool, config.workflow.max_hierarchy_depth).await);
        } else {
            checks.push(DoctorCheck::skipped("org_chart_integrity", "the schema is not current"));
        }

        pool.close().await;
        checks
    })
}

async fn check_schema(pool: &DbPool) -> DoctorCheck {
    let applied: Vec<i64> =
        match sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await
        {
            Ok(applied) => applied,
            Err(_) => {
                return DoctorCheck::fail(
                    "schema_migrations",
                    "no migrations applied; run `hrflow migrate`",
                );
            }
        };

    let applied: HashSet<i64> = applied.into_iter().collect();
    let pending: Vec<String> = MIGRATOR
        .iter()
        .filter(|migration| migration.migration_type.is_up_migration())
        .filter(|migration| !applied.contains(&migration.version))
        .map(|migration| format!("{} {}", migration.version, migration.description))
        .collect();

    if pending.is_empty() {
        DoctorCheck::pass("schema_migrations", format!("{} migration(s) applied", applied.len()))
    } else {
        DoctorCheck::fail("schema_migrations", format!("pending: {}", pending.join(", ")))
    }
}

/// Every active actor's reporting chain must terminate, and each approval
/// role needs at least one active holder for the pool fallback.
async fn check_org_chart(pool: &DbPool, max_depth: usize) -> DoctorCheck {
    let directory = SqlActorDirectory::new(pool.clone());
    let actors = match directory.list_all().await {
        Ok(actors) => actors,
        Err(error) => return DoctorCheck::fail("org_chart_integrity", error.to_string()),
    };
    if actors.is_empty() {
        return DoctorCheck::fail("org_chart_integrity", "no actors found; run `hrflow seed`");
    }

    let resolver = HierarchyResolver::new(max_depth);
    let mut problems = Vec::new();
    for actor in actors.iter().filter(|actor| actor.active) {
        match resolver.walk(&directory, &actor.id).await {
            Ok(HierarchyWalk::Complete(_)) => {}
            Ok(HierarchyWalk::CycleDetected { at }) => {
                problems.push(format!("{}: reporting cycle at {at}", actor.id));
            }
            Ok(HierarchyWalk::DepthExceeded { max_depth }) => {
                problems.push(format!("{}: chain deeper than {max_depth}", actor.id));
            }
            Err(error) => problems.push(format!("{}: {error}", actor.id)),
        }
    }

    for role in Role::ALL.into_iter().filter(|role| *role != Role::Employee) {
        match directory.list_by_role(role).await {
            Ok(holders) if holders.is_empty() => {
                problems.push(format!("no active {} approver", role.as_str()));
            }
            Ok(_) => {}
            Err(error) => problems.push(format!("{}: {error}", role.as_str())),
        }
    }

    if problems.is_empty() {
        DoctorCheck::pass(
            "org_chart_integrity",
            format!("{} actor(s), every reporting chain terminates", actors.len()),
        )
    } else {
        DoctorCheck::fail("org_chart_integrity", problems.join("; "))
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
