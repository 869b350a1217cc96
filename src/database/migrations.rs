use sqlx::PgPool;
use crate::error::AppError;
use tracing::{info, error};

/// Apply the embedded `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            error!("Migration failed: {}", e);
            AppError::DatabaseError(format!("Migration failed: {}", e))
        })?;

    info!("Database migrations completed successfully");
    Ok(())
}
