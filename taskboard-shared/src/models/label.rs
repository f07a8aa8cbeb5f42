/// Label model
///
/// Labels are board-scoped tags with a `#RRGGBB` color.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE labels (
///     id BIGSERIAL PRIMARY KEY,
///     board_id BIGINT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     name VARCHAR(40) NOT NULL,
///     color CHAR(7) NOT NULL CHECK (color ~ '^#[0-9A-Fa-f]{6}$')
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

/// A label on a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Label {
    pub id: i64,
    pub board_id: i64,
    pub name: String,
    pub color: String,
}

/// Returns true for a `#` followed by exactly six hex digits
///
/// # Example
///
/// ```
/// use taskboard_shared::models::label::is_valid_color;
///
/// assert!(is_valid_color("#d73a4a"));
/// assert!(!is_valid_color("d73a4a"));
/// assert!(!is_valid_color("#d73a4"));
/// ```
pub fn is_valid_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

impl Label {
    pub async fn create<'e, E>(
        executor: E,
        board_id: i64,
        name: &str,
        color: &str,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Label>(
            r#"
            INSERT INTO labels (board_id, name, color)
            VALUES ($1, $2, $3)
            RETURNING id, board_id, name, color
            "#,
        )
        .bind(board_id)
        .bind(name)
        .bind(color)
        .fetch_one(executor)
        .await
    }

    pub async fn list_by_board(pool: &PgPool, board_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Label>(
            "SELECT id, board_id, name, color FROM labels WHERE board_id = $1 ORDER BY id",
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// Fetches labels by ID; missing IDs are absent from the result
    pub async fn find_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, Label>(
            "SELECT id, board_id, name, color FROM labels WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("#d73a4a", true)]
    #[case("#0E8A16", true)]
    #[case("#fbca04", true)]
    #[case("fbca04", false)]
    #[case("#fbca0", false)]
    #[case("#fbca044", false)]
    #[case("#gggggg", false)]
    #[case("", false)]
    fn test_is_valid_color(#[case] color: &str, #[case] expected: bool) {
        assert_eq!(is_valid_color(color), expected);
    }
}
