/// PostgreSQL adapter for the persistence port
///
/// Each unit of work is a single `SERIALIZABLE` transaction with a bounded
/// `lock_timeout`.
///
/// # Locking
///
/// A column row is the lock for everything inside it. Claiming columns takes
/// `FOR UPDATE` on them in ascending ID order and bumps their `task_version`,
/// all in one call. Task rows are only locked after the columns holding them
/// are claimed. `Task::create` bumps the same counter before it computes the
/// next position, so an insert and a reorder on one column queue behind each
/// other, and the one that waited fails with a serialization conflict
/// (`40001`) rather than working from a stale snapshot.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use taskboard_shared::store::{postgres::PgBoardStore, BoardStore};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgBoardStore::new(pool, Duration::from_millis(2000));
///
/// let mut uow = store.begin().await?;
/// let tasks = uow.fetch_tasks_by_ids(&[1, 2, 3]).await?;
/// println!("locked {} tasks", tasks.len());
/// uow.commit().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::debug;

use super::{BoardStore, ColumnSnapshot, StoreResult, TaskSnapshot, UnitOfWork};

/// Store backed by a PostgreSQL connection pool
#[derive(Clone, Debug)]
pub struct PgBoardStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgBoardStore {
    /// Creates a store that opens transactions on `pool`
    ///
    /// `lock_timeout` bounds how long any statement waits for a row lock
    /// before the unit of work fails as retryable.
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Returns the configured lock timeout
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }
}

#[async_trait]
impl BoardStore for PgBoardStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        // SET does not accept bind parameters
        let lock_timeout = format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        );
        sqlx::query(&lock_timeout).execute(&mut *tx).await?;

        debug!(lock_timeout_ms = self.lock_timeout.as_millis() as u64, "Opened unit of work");

        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// A unit of work holding an open PostgreSQL transaction
///
/// Dropping it without calling [`UnitOfWork::commit`] rolls the transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn fetch_columns_by_ids(&mut self, ids: &[i64]) -> StoreResult<Vec<ColumnSnapshot>> {
        let columns = sqlx::query_as::<_, ColumnSnapshot>(
            r#"
            SELECT c.id, c.board_id, b.owner_id
            FROM columns c
            JOIN boards b ON b.id = c.board_id
            WHERE c.id = ANY($1)
            ORDER BY c.id
            FOR UPDATE OF c
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;

        // Rows are already locked, so this cannot wait. It marks the columns
        // as written by this transaction for every concurrent snapshot.
        sqlx::query("UPDATE columns SET task_version = task_version + 1 WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;

        debug!(columns = ?ids, claimed = columns.len(), "Claimed columns");
        Ok(columns)
    }

    async fn fetch_tasks_by_ids(&mut self, ids: &[i64]) -> StoreResult<Vec<TaskSnapshot>> {
        let tasks = sqlx::query_as::<_, TaskSnapshot>(
            r#"
            SELECT t.id, t.board_id, t.column_id, t.position, t.created_at, b.owner_id
            FROM tasks t
            JOIN boards b ON b.id = t.board_id
            WHERE t.id = ANY($1)
            ORDER BY t.id
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(tasks)
    }

    async fn fetch_tasks_by_column(
        &mut self,
        column_id: i64,
        excluding: &[i64],
    ) -> StoreResult<Vec<TaskSnapshot>> {
        let tasks = sqlx::query_as::<_, TaskSnapshot>(
            r#"
            SELECT t.id, t.board_id, t.column_id, t.position, t.created_at, b.owner_id
            FROM tasks t
            JOIN boards b ON b.id = t.board_id
            WHERE t.column_id = $1
              AND NOT (t.id = ANY($2))
            ORDER BY t.position, t.created_at, t.id
            FOR UPDATE OF t
            "#,
        )
        .bind(column_id)
        .bind(excluding)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(tasks)
    }

    async fn update_task_position_and_column(
        &mut self,
        task_id: i64,
        column_id: i64,
        position: i32,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET column_id = $2,
                position = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .bind(column_id)
        .bind(position)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_task(&mut self, task_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let PgUnitOfWork { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let PgUnitOfWork { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
