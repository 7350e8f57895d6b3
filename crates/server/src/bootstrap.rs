use std::sync::Arc;

use hrflow_core::config::{AppConfig, ConfigError};
use hrflow_core::workflow::WorkflowEngine;
use hrflow_core::SystemClock;
use hrflow_db::{connect_with_config, migrations, DbPool, SqlActorDirectory, SqlWorkflowStore};
use thiserror::Error;
use tracing::info;

use crate::api::Engine;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<Engine>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        max_connections = config.database.max_connections,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let engine = WorkflowEngine::new(
        SqlWorkflowStore::new(db_pool.clone()),
        SqlActorDirectory::new(db_pool.clone()),
        SystemClock,
    )
    .with_router(config.workflow.router());

    Ok(Application { config, db_pool, engine: Arc::new(engine) })
}

#[cfg(test)]
mod tests {
    use hrflow_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use hrflow_core::domain::actor::ActorId;
    use hrflow_core::domain::request::{
        BusinessTripPayload, CreateRequestInput, RequestPayload,
    };
    use hrflow_core::workflow::{TransitionCommand, WorkflowAction, WorkflowStatus};
    use hrflow_db::DemoOrgChart;
    use rust_decimal::Decimal;

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?).await
    }

    fn in_memory() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_non_sqlite_urls() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://localhost/hrflow".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"), "unexpected error: {message}");
    }

    #[tokio::test]
    async fn bootstrapped_engine_runs_a_trip_through_configured_sequence() {
        let app = bootstrap(in_memory()).await.expect("bootstrap should succeed");
        DemoOrgChart::load(&app.db_pool).await.expect("seed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
             AND name IN ('actor', 'workflow_request', 'approval_log', 'request_version_snapshot')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("count tables");
        assert_eq!(table_count, 4);

        let payload = RequestPayload::BusinessTrip(BusinessTripPayload {
            destination: "Jakarta".to_string(),
            purpose: "Vendor audit".to_string(),
            departure_date: "2026-05-11".parse().expect("date"),
            return_date: "2026-05-13".parse().expect("date"),
            estimated_cost: Decimal::new(180_000, 2),
        });
        let created = app
            .engine
            .create(CreateRequestInput { payload, save_as_draft: false }, &ActorId::new("fin-1"))
            .await
            .expect("create");
        assert_eq!(created.status, WorkflowStatus::PendingHr);

        let receipt = app
            .engine
            .transition(TransitionCommand::new(
                created.id.clone(),
                ActorId::new("hr-1"),
                WorkflowAction::Approve,
                created.version,
            ))
            .await
            .expect("hr approves");
        assert_eq!(receipt.new_status, WorkflowStatus::PendingCeo);

        app.db_pool.close().await;
    }
}
