/// Reorder transaction coordinator
///
/// Orchestrates a move batch as one unit of work:
///
/// ```text
/// validate batch ─> begin ─> fetch tasks
///                          ─> claim source + target columns (ascending ID)
///                          ─> re-read tasks, ownership guard
///                          ─> board consistency check
///                          ─> fetch residents of every affected column
///                          ─> normalize ─> persist ─> commit
/// ```
///
/// Any failure after `begin` rolls the unit of work back, so either every
/// write of the batch becomes visible or none does. A retryable failure
/// (lock timeout, serialization conflict) reruns the whole batch in a fresh
/// unit of work, up to the coordinator's attempt limit.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::normalizer::{normalize, normalize_column, ColumnPlan, IncomingTask, ResidentTask};
use super::{ReorderError, ReorderOutcome, TaskMove};
use crate::auth::authorization::{verify_ownership, EntityRef, OwnershipSnapshot};
use crate::store::{BoardStore, ColumnSnapshot, StoreError, TaskSnapshot, UnitOfWork};

/// Attempts per operation before a retryable failure reaches the caller
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Pause before the second attempt, doubled for each later one
const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Stateless coordinator over a [`BoardStore`]
#[derive(Clone)]
pub struct ReorderCoordinator {
    store: Arc<dyn BoardStore>,
    max_attempts: u32,
}

impl ReorderCoordinator {
    /// Creates a coordinator using `store` for every unit of work
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets how many times a retryable failure is attempted in total (at least once)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns the configured attempt limit
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `attempt` until it succeeds, fails for good, or runs out of attempts
    async fn with_retries<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, ReorderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ReorderError>>,
    {
        let mut backoff = RETRY_BACKOFF;
        let mut number = 1;
        loop {
            match attempt().await {
                Err(err) if err.is_retryable() && number < self.max_attempts => {
                    debug!(operation, attempt = number, error = %err, "Retrying after conflict");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    number += 1;
                }
                result => return result,
            }
        }
    }

    /// Applies a batch of moves atomically for `user_id`
    ///
    /// On success every affected column (each target column and each column a
    /// task left) holds positions `0..n-1`.
    ///
    /// # Errors
    ///
    /// - [`ReorderError::InvalidInput`] for duplicate task IDs or a move into
    ///   a column on a different board than the task
    /// - [`ReorderError::NotFound`] if a task or target column does not exist
    /// - [`ReorderError::Forbidden`] if the user does not own every moved task
    ///   and target column
    /// - [`ReorderError::Retryable`] on lock timeout or serialization conflict
    pub async fn reorder_tasks(
        &self,
        user_id: Uuid,
        moves: &[TaskMove],
    ) -> Result<ReorderOutcome, ReorderError> {
        validate_batch(moves)?;

        if moves.is_empty() {
            debug!(%user_id, "Empty move batch, nothing to do");
            return Ok(ReorderOutcome::default());
        }

        let outcome = self
            .with_retries("reorder", move || self.try_reorder(user_id, moves))
            .await?;
        info!(
            %user_id,
            moves = moves.len(),
            columns = ?outcome.columns,
            updated_tasks = outcome.updated_tasks,
            "Reordered tasks"
        );
        Ok(outcome)
    }

    async fn try_reorder(
        &self,
        user_id: Uuid,
        moves: &[TaskMove],
    ) -> Result<ReorderOutcome, ReorderError> {
        let mut uow = self.store.begin().await?;

        let result = apply_moves(uow.as_mut(), user_id, moves).await;
        match result {
            Ok(outcome) => {
                uow.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                debug!(%user_id, error = %err, "Reorder aborted");
                rollback(uow).await;
                Err(err)
            }
        }
    }

    /// Deletes a task and compacts the column it leaves
    ///
    /// # Errors
    ///
    /// - [`ReorderError::NotFound`] if the task does not exist
    /// - [`ReorderError::Forbidden`] if the user does not own the task
    /// - [`ReorderError::Retryable`] on lock timeout or serialization conflict
    pub async fn delete_task(&self, user_id: Uuid, task_id: i64) -> Result<(), ReorderError> {
        let compacted = self
            .with_retries("delete", move || self.try_delete(user_id, task_id))
            .await?;
        info!(%user_id, task_id, compacted, "Deleted task");
        Ok(())
    }

    async fn try_delete(&self, user_id: Uuid, task_id: i64) -> Result<usize, ReorderError> {
        let mut uow = self.store.begin().await?;

        let result = remove_task(uow.as_mut(), user_id, task_id).await;
        match result {
            Ok(compacted) => {
                uow.commit().await?;
                Ok(compacted)
            }
            Err(err) => {
                debug!(%user_id, task_id, error = %err, "Task deletion aborted");
                rollback(uow).await;
                Err(err)
            }
        }
    }
}

/// Rejects batches that name the same task more than once
fn validate_batch(moves: &[TaskMove]) -> Result<(), ReorderError> {
    let mut seen = HashSet::with_capacity(moves.len());
    for mv in moves {
        if !seen.insert(mv.task_id) {
            return Err(ReorderError::InvalidInput(format!(
                "task {} appears more than once in the batch",
                mv.task_id
            )));
        }
    }
    Ok(())
}

async fn rollback(uow: Box<dyn UnitOfWork>) {
    if let Err(err) = uow.rollback().await {
        warn!(error = %err, "Failed to roll back unit of work");
    }
}

fn ownership_snapshot(tasks: &[TaskSnapshot], columns: &[ColumnSnapshot]) -> OwnershipSnapshot {
    let mut snapshot = OwnershipSnapshot::new();
    for task in tasks {
        snapshot.insert_board(task.board_id, task.owner_id);
        snapshot.insert_task(task.id, task.board_id);
    }
    for column in columns {
        snapshot.insert_board(column.board_id, column.owner_id);
        snapshot.insert_column(column.id, column.board_id);
    }
    snapshot
}

async fn apply_moves(
    uow: &mut dyn UnitOfWork,
    user_id: Uuid,
    moves: &[TaskMove],
) -> Result<ReorderOutcome, ReorderError> {
    let task_ids: Vec<i64> = moves.iter().map(|mv| mv.task_id).collect();

    let sources: BTreeSet<i64> = uow
        .fetch_tasks_by_ids(&task_ids)
        .await?
        .iter()
        .map(|task| task.column_id)
        .collect();

    // Source columns are claimed together with the targets, before any task row
    let affected: BTreeSet<i64> = moves
        .iter()
        .map(|mv| mv.to_column)
        .chain(sources)
        .collect();
    let column_ids: Vec<i64> = affected.iter().copied().collect();

    let fetched_columns = uow.fetch_columns_by_ids(&column_ids).await?;
    let columns: HashMap<i64, ColumnSnapshot> = fetched_columns
        .iter()
        .map(|column| (column.id, *column))
        .collect();

    let fetched_tasks = claimed_tasks(uow, &task_ids, &affected).await?;
    let tasks: HashMap<i64, TaskSnapshot> =
        fetched_tasks.iter().map(|task| (task.id, *task)).collect();
    if let Some(missing) = task_ids.iter().find(|id| !tasks.contains_key(*id)) {
        return Err(ReorderError::NotFound {
            kind: "task",
            id: *missing,
        });
    }
    if let Some(missing) = moves.iter().find(|mv| !columns.contains_key(&mv.to_column)) {
        return Err(ReorderError::NotFound {
            kind: "column",
            id: missing.to_column,
        });
    }

    let snapshot = ownership_snapshot(&fetched_tasks, &fetched_columns);
    verify_ownership(
        user_id,
        moves
            .iter()
            .flat_map(|mv| [EntityRef::Task(mv.task_id), EntityRef::Column(mv.to_column)]),
        &snapshot,
    )?;

    let mut plans: BTreeMap<i64, ColumnPlan> = BTreeMap::new();
    for (request_order, mv) in moves.iter().enumerate() {
        let task = tasks[&mv.task_id];
        let column = columns[&mv.to_column];
        if task.board_id != column.board_id {
            return Err(ReorderError::InvalidInput(format!(
                "task {} cannot move to column {} on another board",
                mv.task_id, mv.to_column
            )));
        }

        plans.entry(mv.to_column).or_default().incoming.push(IncomingTask {
            task_id: mv.task_id,
            target_position: mv.target_position(),
            request_order,
        });
    }

    for column_id in &affected {
        let residents = uow.fetch_tasks_by_column(*column_id, &task_ids).await?;
        plans.entry(*column_id).or_default().residents =
            residents.iter().map(ResidentTask::from).collect();
    }

    let mut updated_tasks = 0;
    for (column_id, updates) in normalize(&plans) {
        debug!(column_id, updates = updates.len(), "Normalized column");
        for update in updates {
            uow.update_task_position_and_column(update.task_id, update.column_id, update.position)
                .await?;
            updated_tasks += 1;
        }
    }

    Ok(ReorderOutcome {
        columns: column_ids,
        updated_tasks,
    })
}

/// Re-reads tasks once their columns are claimed
///
/// A task that left the claimed columns in between belongs to a batch that
/// committed first, so the attempt is retried from scratch.
async fn claimed_tasks(
    uow: &mut dyn UnitOfWork,
    task_ids: &[i64],
    claimed: &BTreeSet<i64>,
) -> Result<Vec<TaskSnapshot>, ReorderError> {
    let tasks = uow.fetch_tasks_by_ids(task_ids).await?;
    if let Some(moved) = tasks.iter().find(|task| !claimed.contains(&task.column_id)) {
        return Err(StoreError::Retryable(format!(
            "task {} moved to column {} concurrently",
            moved.id, moved.column_id
        ))
        .into());
    }
    Ok(tasks)
}

async fn remove_task(
    uow: &mut dyn UnitOfWork,
    user_id: Uuid,
    task_id: i64,
) -> Result<usize, ReorderError> {
    let column_id = uow
        .fetch_tasks_by_ids(&[task_id])
        .await?
        .first()
        .map(|task| task.column_id)
        .ok_or(ReorderError::NotFound { kind: "task", id: task_id })?;

    let columns = uow.fetch_columns_by_ids(&[column_id]).await?;
    let fetched = claimed_tasks(uow, &[task_id], &BTreeSet::from([column_id])).await?;
    let task = fetched
        .first()
        .copied()
        .ok_or(ReorderError::NotFound { kind: "task", id: task_id })?;

    let snapshot = ownership_snapshot(&fetched, &columns);
    verify_ownership(user_id, [EntityRef::Task(task_id)], &snapshot)?;

    if !uow.delete_task(task_id).await? {
        return Err(ReorderError::NotFound { kind: "task", id: task_id });
    }

    let residents = uow.fetch_tasks_by_column(task.column_id, &[]).await?;
    let plan = ColumnPlan {
        residents: residents.iter().map(ResidentTask::from).collect(),
        incoming: Vec::new(),
    };

    let updates = normalize_column(task.column_id, &plan);
    for update in &updates {
        uow.update_task_position_and_column(update.task_id, update.column_id, update.position)
            .await?;
    }

    Ok(updates.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(task_id: i64, to_column: i64) -> TaskMove {
        TaskMove {
            task_id,
            to_column,
            to_position: Some(0),
        }
    }

    #[test]
    fn test_validate_batch_accepts_distinct_tasks() {
        assert!(validate_batch(&[mv(1, 10), mv(2, 10)]).is_ok());
        assert!(validate_batch(&[]).is_ok());
    }

    #[test]
    fn test_validate_batch_rejects_duplicate_task() {
        let err = validate_batch(&[mv(1, 10), mv(2, 10), mv(1, 20)]).unwrap_err();
        assert!(matches!(err, ReorderError::InvalidInput(msg) if msg.contains("task 1")));
    }

    #[test]
    fn test_ownership_snapshot_resolves_tasks_and_columns() {
        let owner = Uuid::new_v4();
        let tasks = [TaskSnapshot {
            id: 5,
            board_id: 1,
            column_id: 10,
            position: 0,
            created_at: chrono::Utc::now(),
            owner_id: owner,
        }];
        let columns = [ColumnSnapshot {
            id: 10,
            board_id: 1,
            owner_id: owner,
        }];

        let snapshot = ownership_snapshot(&tasks, &columns);
        assert_eq!(snapshot.owner_of(EntityRef::Task(5)), Some(owner));
        assert_eq!(snapshot.owner_of(EntityRef::Column(10)), Some(owner));
        assert_eq!(snapshot.owner_of(EntityRef::Column(11)), None);
    }
}
