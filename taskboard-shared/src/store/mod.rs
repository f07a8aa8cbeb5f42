/// Persistence port for the reorder core
///
/// The reorder coordinator never talks to the database directly. It opens a
/// [`UnitOfWork`] from a [`BoardStore`], reads immutable snapshots through it,
/// writes position updates through it, and finally commits or rolls it back.
///
/// # Adapters
///
/// - [`postgres::PgBoardStore`]: one `SERIALIZABLE` transaction per unit of work
/// - [`memory::InMemoryBoardStore`]: a mutex-serialized in-process store used in
///   tests and local tooling
///
/// # Atomicity
///
/// Writes made through a unit of work become visible only after
/// [`UnitOfWork::commit`]. Dropping a unit of work without committing it
/// discards every write, so a cancelled request never leaves partial state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod memory;
pub mod postgres;

/// Result type for persistence operations
pub type StoreResult<T> = Result<T, StoreError>;

/// PostgreSQL error codes that mean "run the whole unit of work again"
///
/// - `40001`: serialization_failure
/// - `40P01`: deadlock_detected
/// - `55P03`: lock_not_available (raised when `lock_timeout` expires)
const RETRYABLE_SQLSTATES: [&str; 3] = ["40001", "40P01", "55P03"];

/// Errors returned by store adapters
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The unit of work could not complete atomically and may be retried as a whole
    #[error("Retryable conflict: {0}")]
    Retryable(String),

    /// Database failure that retrying will not fix
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Adapter-level failure (broken invariant inside the backend)
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true when the caller should resubmit the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Retryable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_retryable_sqlx_error(&err) {
            StoreError::Retryable(err.to_string())
        } else {
            StoreError::Database(err)
        }
    }
}

/// Classifies sqlx errors that indicate lock contention or serialization conflicts
pub fn is_retryable_sqlx_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| RETRYABLE_SQLSTATES.contains(&&*code))
            .unwrap_or(false),
        _ => false,
    }
}

/// Task row as seen by the reorder core, joined with its board owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskSnapshot {
    /// Task ID
    pub id: i64,

    /// Board the task belongs to (always equal to its column's board)
    pub board_id: i64,

    /// Column currently holding the task
    pub column_id: i64,

    /// Stored position within the column
    pub position: i32,

    /// Creation time, the first tie-breaker between equal stored positions
    pub created_at: DateTime<Utc>,

    /// Owner of the task's board
    pub owner_id: Uuid,
}

/// Column row as seen by the reorder core, joined with its board owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ColumnSnapshot {
    /// Column ID
    pub id: i64,

    /// Board the column belongs to
    pub board_id: i64,

    /// Owner of the column's board
    pub owner_id: Uuid,
}

/// Entry point of a persistence backend
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Opens a new unit of work
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Retryable`] when the backend cannot acquire the
    /// resources for a new unit of work within its lock timeout.
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// An owned, scoped transaction against the store
///
/// Every read returns a snapshot taken inside this unit of work. Columns are
/// the unit of locking: once [`UnitOfWork::fetch_columns_by_ids`] returns, no
/// other unit of work or task insert can change the membership or positions of
/// those columns until this one ends.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Fetches and claims columns by ID, ordered by ID. Missing IDs are simply absent.
    ///
    /// Callers claim every column they will read residents from or write into
    /// in a single call, so claims are always taken in ascending ID order.
    async fn fetch_columns_by_ids(&mut self, ids: &[i64]) -> StoreResult<Vec<ColumnSnapshot>>;

    /// Fetches tasks by ID together with their board owner, ordered by ID
    ///
    /// Does not lock anything. Callers re-check the result once the columns
    /// holding these tasks are claimed.
    async fn fetch_tasks_by_ids(&mut self, ids: &[i64]) -> StoreResult<Vec<TaskSnapshot>>;

    /// Fetches the tasks of a column, skipping `excluding`, ordered by
    /// position, then creation time, then ID
    async fn fetch_tasks_by_column(
        &mut self,
        column_id: i64,
        excluding: &[i64],
    ) -> StoreResult<Vec<TaskSnapshot>>;

    /// Moves a task to a column and position
    async fn update_task_position_and_column(
        &mut self,
        task_id: i64,
        column_id: i64,
        position: i32,
    ) -> StoreResult<()>;

    /// Deletes a task. Returns false when it did not exist.
    async fn delete_task(&mut self, task_id: i64) -> StoreResult<bool>;

    /// Makes every write of this unit of work durable
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards every write of this unit of work
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_retryable() {
        assert!(is_retryable_sqlx_error(&sqlx::Error::PoolTimedOut));
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_retryable());
    }

    #[test]
    fn test_row_not_found_is_not_retryable() {
        assert!(!is_retryable_sqlx_error(&sqlx::Error::RowNotFound));

        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Retryable("lock timeout".to_string());
        assert_eq!(err.to_string(), "Retryable conflict: lock timeout");
    }
}
