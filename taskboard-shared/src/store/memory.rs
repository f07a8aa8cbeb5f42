/// In-memory adapter for the persistence port
///
/// Units of work are serialized by a single async mutex: `begin` waits for the
/// previous unit of work to finish, bounded by the store's lock timeout. Each
/// unit of work mutates a private copy of the state that replaces the shared
/// state only on commit.
///
/// # Example
///
/// ```
/// use taskboard_shared::store::{memory::InMemoryBoardStore, BoardStore};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryBoardStore::new();
/// let board = store.insert_board(Uuid::new_v4()).await;
/// let column = store.insert_column(board).await?;
/// let task = store.insert_task(column).await?;
///
/// let mut uow = store.begin().await?;
/// uow.update_task_position_and_column(task, column, 0).await?;
/// uow.commit().await?;
///
/// assert_eq!(store.column_order(column).await, vec![task]);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{BoardStore, ColumnSnapshot, StoreError, StoreResult, TaskSnapshot, UnitOfWork};

/// Default time a unit of work waits for the store lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy)]
struct ColumnRow {
    board_id: i64,
}

#[derive(Debug, Clone, Copy)]
struct TaskRow {
    board_id: i64,
    column_id: i64,
    position: i32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct BoardState {
    boards: BTreeMap<i64, Uuid>,
    columns: BTreeMap<i64, ColumnRow>,
    tasks: BTreeMap<i64, TaskRow>,
    next_id: i64,
}

impl BoardState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn owner_of_board(&self, board_id: i64) -> StoreResult<Uuid> {
        self.boards
            .get(&board_id)
            .copied()
            .ok_or_else(|| StoreError::Backend(format!("board {} has no row", board_id)))
    }

    fn task_snapshot(&self, id: i64, row: &TaskRow) -> StoreResult<TaskSnapshot> {
        Ok(TaskSnapshot {
            id,
            board_id: row.board_id,
            column_id: row.column_id,
            position: row.position,
            created_at: row.created_at,
            owner_id: self.owner_of_board(row.board_id)?,
        })
    }
}

/// Store keeping boards, columns, and tasks in process memory
#[derive(Clone, Debug)]
pub struct InMemoryBoardStore {
    state: Arc<Mutex<BoardState>>,
    lock_timeout: Duration,
}

impl Default for InMemoryBoardStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBoardStore {
    /// Creates an empty store with the default lock timeout
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Creates an empty store whose units of work wait at most `lock_timeout`
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(BoardState::default())),
            lock_timeout,
        }
    }

    /// Inserts a board and returns its ID
    pub async fn insert_board(&self, owner_id: Uuid) -> i64 {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.boards.insert(id, owner_id);
        id
    }

    /// Inserts a column on `board_id` and returns its ID
    pub async fn insert_column(&self, board_id: i64) -> StoreResult<i64> {
        let mut state = self.state.lock().await;
        state.owner_of_board(board_id)?;
        let id = state.allocate_id();
        state.columns.insert(id, ColumnRow { board_id });
        Ok(id)
    }

    /// Appends a task to a column at `max(position) + 1`
    pub async fn insert_task(&self, column_id: i64) -> StoreResult<i64> {
        let position = {
            let state = self.state.lock().await;
            state
                .tasks
                .values()
                .filter(|task| task.column_id == column_id)
                .map(|task| task.position + 1)
                .max()
                .unwrap_or(0)
        };
        self.insert_task_at(column_id, position).await
    }

    /// Inserts a task with an explicit stored position, gaps and duplicates allowed
    pub async fn insert_task_at(&self, column_id: i64, position: i32) -> StoreResult<i64> {
        self.insert_task_created_at(column_id, position, Utc::now()).await
    }

    /// Inserts a task with an explicit stored position and creation time
    pub async fn insert_task_created_at(
        &self,
        column_id: i64,
        position: i32,
        created_at: DateTime<Utc>,
    ) -> StoreResult<i64> {
        let mut state = self.state.lock().await;
        let board_id = state
            .columns
            .get(&column_id)
            .map(|column| column.board_id)
            .ok_or_else(|| StoreError::Backend(format!("column {} has no row", column_id)))?;
        let id = state.allocate_id();
        state.tasks.insert(
            id,
            TaskRow {
                board_id,
                column_id,
                position,
                created_at,
            },
        );
        Ok(id)
    }

    /// Returns the task IDs of a column in display order
    pub async fn column_order(&self, column_id: i64) -> Vec<i64> {
        let state = self.state.lock().await;
        let mut tasks: Vec<(i32, DateTime<Utc>, i64)> = state
            .tasks
            .iter()
            .filter(|(_, task)| task.column_id == column_id)
            .map(|(id, task)| (task.position, task.created_at, *id))
            .collect();
        tasks.sort_unstable();
        tasks.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Returns the stored positions of a column in display order
    pub async fn column_positions(&self, column_id: i64) -> Vec<i32> {
        let state = self.state.lock().await;
        let mut positions: Vec<i32> = state
            .tasks
            .values()
            .filter(|task| task.column_id == column_id)
            .map(|task| task.position)
            .collect();
        positions.sort_unstable();
        positions
    }

    /// Returns a committed snapshot of a task
    pub async fn task(&self, task_id: i64) -> Option<TaskSnapshot> {
        let state = self.state.lock().await;
        let row = state.tasks.get(&task_id)?;
        state.task_snapshot(task_id, row).ok()
    }
}

#[async_trait]
impl BoardStore for InMemoryBoardStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = tokio::time::timeout(self.lock_timeout, self.state.clone().lock_owned())
            .await
            .map_err(|_| {
                StoreError::Retryable(format!(
                    "store lock not acquired within {}ms",
                    self.lock_timeout.as_millis()
                ))
            })?;

        let staged = (*guard).clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, staged }))
    }
}

/// A unit of work over [`InMemoryBoardStore`]
///
/// Holds the store lock for its whole lifetime.
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<BoardState>,
    staged: BoardState,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn fetch_columns_by_ids(&mut self, ids: &[i64]) -> StoreResult<Vec<ColumnSnapshot>> {
        let mut columns = Vec::new();
        for (id, column) in &self.staged.columns {
            if ids.contains(id) {
                columns.push(ColumnSnapshot {
                    id: *id,
                    board_id: column.board_id,
                    owner_id: self.staged.owner_of_board(column.board_id)?,
                });
            }
        }
        Ok(columns)
    }

    async fn fetch_tasks_by_ids(&mut self, ids: &[i64]) -> StoreResult<Vec<TaskSnapshot>> {
        self.staged
            .tasks
            .iter()
            .filter(|(id, _)| ids.contains(*id))
            .map(|(id, task)| self.staged.task_snapshot(*id, task))
            .collect()
    }

    async fn fetch_tasks_by_column(
        &mut self,
        column_id: i64,
        excluding: &[i64],
    ) -> StoreResult<Vec<TaskSnapshot>> {
        let mut tasks = self
            .staged
            .tasks
            .iter()
            .filter(|(id, task)| task.column_id == column_id && !excluding.contains(*id))
            .map(|(id, task)| self.staged.task_snapshot(*id, task))
            .collect::<StoreResult<Vec<_>>>()?;
        tasks.sort_by_key(|task| (task.position, task.created_at, task.id));
        Ok(tasks)
    }

    async fn update_task_position_and_column(
        &mut self,
        task_id: i64,
        column_id: i64,
        position: i32,
    ) -> StoreResult<()> {
        let board_id = self
            .staged
            .columns
            .get(&column_id)
            .map(|column| column.board_id)
            .ok_or_else(|| StoreError::Backend(format!("column {} has no row", column_id)))?;

        if let Some(task) = self.staged.tasks.get_mut(&task_id) {
            task.board_id = board_id;
            task.column_id = column_id;
            task.position = position;
        }
        Ok(())
    }

    async fn delete_task(&mut self, task_id: i64) -> StoreResult<bool> {
        Ok(self.staged.tasks.remove(&task_id).is_some())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}
