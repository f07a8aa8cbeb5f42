/// Embedded schema migrations
///
/// The SQL files under `taskboard-shared/migrations/` are compiled into the
/// binary with `sqlx::migrate!` and applied at server startup.
///
/// ```text
/// 20250101000001  users
/// 20250101000002  boards, columns, labels
/// 20250101000003  tasks, task_labels, task_assignees
/// ```

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPool;
use tracing::{debug, error, info};

/// Migrations bundled with this crate
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Snapshot of the applied schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Number of successfully applied migrations
    pub applied_migrations: usize,

    /// Version of the newest applied migration
    pub latest_version: Option<i64>,

    /// Whether every bundled migration has been applied
    pub is_up_to_date: bool,
}

/// Applies all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(bundled = MIGRATOR.iter().count(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        error!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Version of the newest bundled migration
pub fn latest_bundled_version() -> Option<i64> {
    MIGRATOR.iter().map(|migration| migration.version).max()
}

/// Reads the applied migrations from `_sqlx_migrations`
pub async fn migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = current_schema()
              AND table_name = '_sqlx_migrations'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
            is_up_to_date: MIGRATOR.iter().next().is_none(),
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    Ok(MigrationStatus {
        applied_migrations: usize::try_from(count).unwrap_or(0),
        latest_version,
        is_up_to_date: latest_version >= latest_bundled_version(),
    })
}
