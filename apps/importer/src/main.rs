//! Bulk role membership importer.
//!
//! Reads role columns from a JSON file and reconciles each one against the
//! PostgreSQL assignment store.

#![forbid(unsafe_code)]

mod importer_config;

use std::path::Path;
use std::sync::Arc;

use aclgate_application::{BulkEditRowOutcome, MembershipService, RoleColumnEdit};
use aclgate_core::{AppError, AppResult};
use aclgate_infrastructure::{
    InMemoryResourceDirectory, PostgresAssignmentStore, PostgresPrincipalDirectory,
    load_role_catalog,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::importer_config::{ImporterConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ImporterConfig::load()?;
    let catalog = Arc::new(load_role_catalog(&config.role_catalog_path)?);
    let rows = read_import_rows(&config.import_path)?;
    let pool = connect_and_migrate(&config).await?;

    let service = MembershipService::new(
        catalog,
        Arc::new(PostgresAssignmentStore::new(pool.clone())),
        Arc::new(PostgresPrincipalDirectory::new(pool)),
        Arc::new(InMemoryResourceDirectory::new()),
    );

    info!(
        rows = rows.len(),
        dry_run = config.dry_run,
        "aclgate-importer started"
    );

    let report = service.apply_bulk_edit(&rows, config.dry_run).await;
    for (row, outcome) in rows.iter().zip(&report.rows) {
        match outcome {
            BulkEditRowOutcome::Applied(change) => info!(
                resource_type = %row.resource_type,
                resource_id = %row.resource_id,
                role = %row.role_name,
                added = change.added.len(),
                removed = change.removed.len(),
                "role column applied"
            ),
            BulkEditRowOutcome::Skipped => info!(
                resource_type = %row.resource_type,
                resource_id = %row.resource_id,
                role = %row.role_name,
                "empty role column skipped"
            ),
            BulkEditRowOutcome::Failed {
                status_code,
                message,
            } => warn!(
                resource_type = %row.resource_type,
                resource_id = %row.resource_id,
                role = %row.role_name,
                status_code,
                error = %message,
                "role column failed"
            ),
        }
    }

    let (added, removed) = report.change_totals();
    info!(
        rows = report.rows.len(),
        failed = report.failed_count(),
        added,
        removed,
        dry_run = config.dry_run,
        "aclgate-importer finished"
    );

    if report.failed_count() > 0 {
        return Err(AppError::Validation(format!(
            "{} of {} import rows failed",
            report.failed_count(),
            report.rows.len()
        )));
    }

    Ok(())
}

fn read_import_rows(path: &Path) -> AppResult<Vec<RoleColumnEdit>> {
    let document = std::fs::read_to_string(path).map_err(|error| {
        AppError::Internal(format!(
            "failed to read import file '{}': {error}",
            path.display()
        ))
    })?;

    serde_json::from_str(document.as_str())
        .map_err(|error| AppError::Validation(format!("invalid import file: {error}")))
}

async fn connect_and_migrate(config: &ImporterConfig) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}
