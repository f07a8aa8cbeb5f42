/// Task reordering
///
/// Applies a batch of task moves atomically and leaves every affected column
/// with contiguous, zero-based positions.
///
/// # Components
///
/// - [`normalizer`]: pure algorithm computing the final order of each column
/// - [`coordinator`]: runs fetch, ownership check, merge, normalize, and
///   persist inside one unit of work
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskboard_shared::reorder::{ReorderCoordinator, TaskMove};
/// use taskboard_shared::store::memory::InMemoryBoardStore;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let owner = Uuid::new_v4();
/// let store = InMemoryBoardStore::new();
/// let board = store.insert_board(owner).await;
/// let todo = store.insert_column(board).await?;
/// let done = store.insert_column(board).await?;
/// let task = store.insert_task(todo).await?;
///
/// let coordinator = ReorderCoordinator::new(Arc::new(store.clone()));
/// coordinator
///     .reorder_tasks(owner, &[TaskMove { task_id: task, to_column: done, to_position: Some(0) }])
///     .await?;
///
/// assert_eq!(store.column_order(done).await, vec![task]);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};

use crate::auth::authorization::AuthzError;
use crate::store::StoreError;

pub mod coordinator;
pub mod normalizer;

pub use coordinator::ReorderCoordinator;

/// A single relocation request: put `task_id` into `to_column` at `to_position`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMove {
    /// Task to move
    pub task_id: i64,

    /// Target column
    pub to_column: i64,

    /// Requested zero-based index; missing or negative means 0, past the end means last
    #[serde(default)]
    pub to_position: Option<i64>,
}

impl TaskMove {
    /// Requested target index with a missing value treated as 0
    pub fn target_position(&self) -> i64 {
        self.to_position.unwrap_or(0)
    }
}

/// Result of a successful reorder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderOutcome {
    /// Columns normalized by the batch, ascending
    pub columns: Vec<i64>,

    /// Number of task rows written
    pub updated_tasks: usize,
}

/// Errors returned by reorder operations
#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    /// Malformed batch (duplicate task, cross-board move)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Referenced entity does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// Acting user does not own every touched entity
    #[error("Forbidden: {0}")]
    Forbidden(#[from] AuthzError),

    /// Lock timeout or serialization conflict; resubmit the whole batch
    #[error("Retryable conflict: {0}")]
    Retryable(String),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Store(#[source] StoreError),
}

impl ReorderError {
    /// Returns true when the caller should resubmit the batch unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReorderError::Retryable(_))
    }
}

impl From<StoreError> for ReorderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Retryable(msg) => ReorderError::Retryable(msg),
            other => ReorderError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_move_deserializes_without_position() {
        let mv: TaskMove = serde_json::from_str(r#"{"task_id": 1, "to_column": 2}"#).unwrap();
        assert_eq!(mv.to_position, None);
        assert_eq!(mv.target_position(), 0);
    }

    #[test]
    fn test_task_move_keeps_negative_position() {
        let mv: TaskMove =
            serde_json::from_str(r#"{"task_id": 1, "to_column": 2, "to_position": -4}"#).unwrap();
        assert_eq!(mv.target_position(), -4);
    }

    #[test]
    fn test_retryable_store_error_maps_to_retryable() {
        let err = ReorderError::from(StoreError::Retryable("lock timeout".to_string()));
        assert!(err.is_retryable());

        let err = ReorderError::from(StoreError::Backend("broken".to_string()));
        assert!(matches!(err, ReorderError::Store(_)));
    }

    #[test]
    fn test_not_found_display() {
        let err = ReorderError::NotFound { kind: "task", id: 9 };
        assert_eq!(err.to_string(), "task 9 not found");
    }
}
