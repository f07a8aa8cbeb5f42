/// Column model
///
/// Columns are the ordered lanes of a board. A new column is appended after
/// the board's current last column, with the board row locked so two
/// concurrent appends cannot pick the same position.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE columns (
///     id BIGSERIAL PRIMARY KEY,
///     board_id BIGINT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     name VARCHAR(80) NOT NULL,
///     position INTEGER NOT NULL DEFAULT 0 CHECK (position >= 0),
///     task_version BIGINT NOT NULL DEFAULT 0
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

/// A column on a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Column {
    pub id: i64,
    pub board_id: i64,
    pub name: String,

    /// Zero-based rank among the board's columns
    pub position: i32,
}

impl Column {
    /// Appends a column to a board at `max(position) + 1` in its own transaction
    pub async fn create(pool: &PgPool, board_id: i64, name: &str) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let column = Self::create_in(&mut *tx, board_id, name).await?;
        tx.commit().await?;
        Ok(column)
    }

    /// Appends a column inside the caller's transaction
    ///
    /// Locks the board row until that transaction ends. Returns
    /// [`sqlx::Error::RowNotFound`] when the board does not exist.
    pub async fn create_in(
        conn: &mut PgConnection,
        board_id: i64,
        name: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM boards WHERE id = $1 FOR UPDATE")
            .bind(board_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        sqlx::query_as::<_, Column>(
            r#"
            INSERT INTO columns (board_id, name, position)
            SELECT $1, $2, COALESCE(MAX(position) + 1, 0)
            FROM columns
            WHERE board_id = $1
            RETURNING id, board_id, name, position
            "#,
        )
        .bind(board_id)
        .bind(name)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Column>("SELECT id, board_id, name, position FROM columns WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a board's columns in display order
    pub async fn list_by_board(pool: &PgPool, board_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Column>(
            r#"
            SELECT id, board_id, name, position
            FROM columns
            WHERE board_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }
}
