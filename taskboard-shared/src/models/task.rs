/// Task model
///
/// Tasks live in a column and carry a zero-based position within it. The
/// board ID is denormalized from the column so ownership checks need no join
/// through columns.
///
/// Creation appends at `max(position) + 1`. Moves, reorders, and deletions go
/// through [`crate::reorder::ReorderCoordinator`], which keeps positions
/// contiguous.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     board_id BIGINT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     column_id BIGINT NOT NULL REFERENCES columns(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     position INTEGER NOT NULL DEFAULT 0 CHECK (position >= 0),
///     due_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE task_labels (task_id BIGINT, label_id BIGINT, PRIMARY KEY (task_id, label_id));
/// CREATE TABLE task_assignees (task_id BIGINT, user_id UUID, PRIMARY KEY (task_id, user_id));
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{CreateTask, Task};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     board_id: 1,
///     column_id: 1,
///     title: "Write release notes".to_string(),
///     description: String::new(),
///     due_at: None,
///     label_ids: vec![2],
///     assignee_ids: vec![],
/// }).await?;
/// println!("task {} at position {}", task.id, task.position);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// A task with its label and assignee sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub board_id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: String,

    /// Zero-based rank within the column
    pub position: i32,

    pub due_at: Option<DateTime<Utc>>,

    /// Label IDs, ascending
    pub label_ids: Vec<i64>,

    /// Assigned user IDs
    pub assignee_ids: Vec<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
///
/// Callers check that the column and labels belong to `board_id` and that
/// every assignee exists before calling [`Task::create`].
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub board_id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: String,
    pub due_at: Option<DateTime<Utc>>,
    pub label_ids: Vec<i64>,
    pub assignee_ids: Vec<Uuid>,
}

const TASK_COLUMNS: &str = r#"
    t.id, t.board_id, t.column_id, t.title, t.description, t.position, t.due_at,
    ARRAY(SELECT tl.label_id FROM task_labels tl WHERE tl.task_id = t.id ORDER BY tl.label_id) AS label_ids,
    ARRAY(SELECT ta.user_id FROM task_assignees ta WHERE ta.task_id = t.id ORDER BY ta.user_id) AS assignee_ids,
    t.created_at, t.updated_at
"#;

impl Task {
    /// Creates a task at the end of its column, with its labels and assignees
    ///
    /// Runs in its own transaction so the task never exists without its sets.
    /// The column is claimed first, the same way a reorder claims it, so the
    /// next position is computed after any in-flight reorder of that column
    /// has committed. Returns [`sqlx::Error::RowNotFound`] when the column
    /// does not exist.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query_scalar::<_, i64>(
            "UPDATE columns SET task_version = task_version + 1 WHERE id = $1 RETURNING id",
        )
        .bind(data.column_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (board_id, column_id, title, description, position, due_at)
            SELECT $1, $2, $3, $4, COALESCE(MAX(position) + 1, 0), $5
            FROM tasks
            WHERE column_id = $2
            RETURNING id
            "#,
        )
        .bind(data.board_id)
        .bind(data.column_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.due_at)
        .fetch_one(&mut *tx)
        .await?;

        if !data.label_ids.is_empty() {
            sqlx::query(
                "INSERT INTO task_labels (task_id, label_id) SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(&data.label_ids)
            .execute(&mut *tx)
            .await?;
        }

        if !data.assignee_ids.is_empty() {
            sqlx::query(
                "INSERT INTO task_assignees (task_id, user_id) SELECT $1, UNNEST($2::UUID[]) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(&data.assignee_ids)
            .execute(&mut *tx)
            .await?;
        }

        let task = Self::find_by_id(&mut *tx, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        tx.commit().await?;
        Ok(task)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM tasks t WHERE t.id = $1", TASK_COLUMNS);
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists a board's tasks by column, then position, then creation time
    pub async fn list_by_board(pool: &PgPool, board_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM tasks t WHERE t.board_id = $1 ORDER BY t.column_id, t.position, t.created_at, t.id",
            TASK_COLUMNS
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(board_id)
            .fetch_all(pool)
            .await
    }
}
