/// Board model
///
/// A board is the ownership root: its columns, labels, and tasks are removed
/// with it (`ON DELETE CASCADE`) and are owned by whoever owns the board.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id BIGSERIAL PRIMARY KEY,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(120) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Seeding
///
/// [`Board::seed_default`] creates a board with the standard lanes
/// `To Do`, `In Progress`, `Done` and the labels `Bug`, `Feature`, `Chore`.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::board::Board;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner: Uuid) -> Result<(), sqlx::Error> {
/// let detail = Board::seed_default(&pool, owner, "My board").await?;
/// assert_eq!(detail.columns.len(), 3);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::column::Column;
use super::label::Label;
use super::task::Task;

/// Columns created by [`Board::seed_default`], in order
pub const DEFAULT_COLUMNS: [&str; 3] = ["To Do", "In Progress", "Done"];

/// Labels created by [`Board::seed_default`] as `(name, color)`
pub const DEFAULT_LABELS: [(&str, &str); 3] = [
    ("Bug", "#d73a4a"),
    ("Feature", "#0e8a16"),
    ("Chore", "#fbca04"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    pub id: i64,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A column with its tasks in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDetail {
    #[serde(flatten)]
    pub column: Column,
    pub tasks: Vec<Task>,
}

/// A board with everything on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,
    pub columns: Vec<ColumnDetail>,
    pub labels: Vec<Label>,
}

impl BoardDetail {
    /// Groups tasks under their columns, keeping each list's order
    pub fn assemble(board: Board, columns: Vec<Column>, tasks: Vec<Task>, labels: Vec<Label>) -> Self {
        let mut columns: Vec<ColumnDetail> = columns
            .into_iter()
            .map(|column| ColumnDetail {
                column,
                tasks: Vec::new(),
            })
            .collect();

        for task in tasks {
            if let Some(detail) = columns.iter_mut().find(|d| d.column.id == task.column_id) {
                detail.tasks.push(task);
            }
        }

        Self {
            board,
            columns,
            labels,
        }
    }
}

impl Board {
    pub async fn create(pool: &PgPool, owner_id: Uuid, name: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (owner_id, name)
            VALUES ($1, $2)
            RETURNING id, owner_id, name, created_at
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_one(pool)
        .await
    }

    /// Creates a board with the default columns and labels in one transaction
    pub async fn seed_default(
        pool: &PgPool,
        owner_id: Uuid,
        name: &str,
    ) -> Result<BoardDetail, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (owner_id, name)
            VALUES ($1, $2)
            RETURNING id, owner_id, name, created_at
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

        let mut columns = Vec::with_capacity(DEFAULT_COLUMNS.len());
        for column_name in DEFAULT_COLUMNS {
            columns.push(Column::create_in(&mut *tx, board.id, column_name).await?);
        }

        let mut labels = Vec::with_capacity(DEFAULT_LABELS.len());
        for (label_name, color) in DEFAULT_LABELS {
            labels.push(Label::create(&mut *tx, board.id, label_name, color).await?);
        }

        tx.commit().await?;

        Ok(BoardDetail::assemble(board, columns, Vec::new(), labels))
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>("SELECT id, owner_id, name, created_at FROM boards WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's boards, newest first
    pub async fn list_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            r#"
            SELECT id, owner_id, name, created_at
            FROM boards
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    /// Loads columns, tasks, and labels of a board
    pub async fn load_detail(pool: &PgPool, board: Board) -> Result<BoardDetail, sqlx::Error> {
        let columns = Column::list_by_board(pool, board.id).await?;
        let tasks = Task::list_by_board(pool, board.id).await?;
        let labels = Label::list_by_board(pool, board.id).await?;

        Ok(BoardDetail::assemble(board, columns, tasks, labels))
    }

    /// Deletes a board and, by cascade, everything on it
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, column_id: i64, position: i32) -> Task {
        Task {
            id,
            board_id: 1,
            column_id,
            title: format!("task {}", id),
            description: String::new(),
            position,
            due_at: None,
            label_ids: vec![],
            assignee_ids: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn column(id: i64, position: i32) -> Column {
        Column {
            id,
            board_id: 1,
            name: format!("column {}", id),
            position,
        }
    }

    #[test]
    fn test_default_seed_contents() {
        assert_eq!(DEFAULT_COLUMNS, ["To Do", "In Progress", "Done"]);
        assert!(DEFAULT_LABELS
            .iter()
            .all(|(_, color)| super::super::label::is_valid_color(color)));
    }

    #[test]
    fn test_assemble_groups_tasks_by_column() {
        let board = Board {
            id: 1,
            owner_id: Uuid::new_v4(),
            name: "Board".to_string(),
            created_at: Utc::now(),
        };

        let detail = BoardDetail::assemble(
            board,
            vec![column(10, 0), column(20, 1)],
            vec![task(1, 10, 0), task(2, 20, 0), task(3, 10, 1)],
            vec![],
        );

        let ids: Vec<Vec<i64>> = detail
            .columns
            .iter()
            .map(|c| c.tasks.iter().map(|t| t.id).collect())
            .collect();
        assert_eq!(ids, vec![vec![1, 3], vec![2]]);
    }

    #[test]
    fn test_detail_serializes_flat() {
        let board = Board {
            id: 7,
            owner_id: Uuid::new_v4(),
            name: "Board".to_string(),
            created_at: Utc::now(),
        };
        let detail = BoardDetail::assemble(board, vec![column(10, 0)], vec![], vec![]);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["columns"][0]["name"], "column 10");
        assert!(json["columns"][0]["tasks"].as_array().unwrap().is_empty());
    }
}
