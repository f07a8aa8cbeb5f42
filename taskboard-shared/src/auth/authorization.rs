/// Ownership guard
///
/// Every mutation of board data is authorized through one check: each entity
/// the operation touches must resolve to a board owned by the acting user.
///
/// # Ownership Model
///
/// ```text
/// User ──owns──> Board ──has──> Column ──has──> Task
///                      └─has──> Label
/// ```
///
/// Ownership is transitive: a task, column, or label is owned by a user iff
/// its board's owner is that user.
///
/// # Snapshots
///
/// The guard never reads from the database. Callers build an
/// [`OwnershipSnapshot`] from rows they already fetched inside their own
/// transaction, so the check runs against exactly the data the operation is
/// about to modify.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::authorization::{verify_ownership, EntityRef, OwnershipSnapshot};
/// use uuid::Uuid;
///
/// let owner = Uuid::new_v4();
/// let snapshot = OwnershipSnapshot::new()
///     .with_board(1, owner)
///     .with_column(10, 1)
///     .with_task(100, 1);
///
/// assert!(verify_ownership(owner, [EntityRef::Column(10), EntityRef::Task(100)], &snapshot).is_ok());
/// assert!(verify_ownership(Uuid::new_v4(), [EntityRef::Task(100)], &snapshot).is_err());
/// ```

use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Error type for authorization checks
///
/// Both variants surface to clients as the same `Forbidden` response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Entity belongs to a board owned by someone else
    #[error("Not authorized to access {entity}")]
    NotAuthorized { entity: EntityRef },

    /// Entity could not be resolved to an owning board
    #[error("Unknown entity {0}")]
    UnknownEntity(EntityRef),
}

/// Reference to an entity that an operation touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Board(i64),
    Column(i64),
    Label(i64),
    Task(i64),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Board(id) => write!(f, "board {}", id),
            EntityRef::Column(id) => write!(f, "column {}", id),
            EntityRef::Label(id) => write!(f, "label {}", id),
            EntityRef::Task(id) => write!(f, "task {}", id),
        }
    }
}

/// Board ownership facts gathered by the caller
#[derive(Debug, Clone, Default)]
pub struct OwnershipSnapshot {
    boards: HashMap<i64, Uuid>,
    columns: HashMap<i64, i64>,
    labels: HashMap<i64, i64>,
    tasks: HashMap<i64, i64>,
}

impl OwnershipSnapshot {
    /// Creates an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the owner of a board
    pub fn insert_board(&mut self, board_id: i64, owner_id: Uuid) {
        self.boards.insert(board_id, owner_id);
    }

    /// Records the board of a column
    pub fn insert_column(&mut self, column_id: i64, board_id: i64) {
        self.columns.insert(column_id, board_id);
    }

    /// Records the board of a label
    pub fn insert_label(&mut self, label_id: i64, board_id: i64) {
        self.labels.insert(label_id, board_id);
    }

    /// Records the board of a task
    pub fn insert_task(&mut self, task_id: i64, board_id: i64) {
        self.tasks.insert(task_id, board_id);
    }

    pub fn with_board(mut self, board_id: i64, owner_id: Uuid) -> Self {
        self.insert_board(board_id, owner_id);
        self
    }

    pub fn with_column(mut self, column_id: i64, board_id: i64) -> Self {
        self.insert_column(column_id, board_id);
        self
    }

    pub fn with_label(mut self, label_id: i64, board_id: i64) -> Self {
        self.insert_label(label_id, board_id);
        self
    }

    pub fn with_task(mut self, task_id: i64, board_id: i64) -> Self {
        self.insert_task(task_id, board_id);
        self
    }

    /// Resolves an entity to the owner of its board
    pub fn owner_of(&self, entity: EntityRef) -> Option<Uuid> {
        let board_id = match entity {
            EntityRef::Board(id) => id,
            EntityRef::Column(id) => *self.columns.get(&id)?,
            EntityRef::Label(id) => *self.labels.get(&id)?,
            EntityRef::Task(id) => *self.tasks.get(&id)?,
        };
        self.boards.get(&board_id).copied()
    }
}

/// Verifies that every entity resolves to a board owned by `user_id`
///
/// Fails on the first entity that is unknown or owned by another user.
/// Has no side effects.
///
/// # Errors
///
/// - [`AuthzError::UnknownEntity`] if an entity is missing from the snapshot
/// - [`AuthzError::NotAuthorized`] if an entity belongs to another user's board
pub fn verify_ownership<I>(
    user_id: Uuid,
    entities: I,
    snapshot: &OwnershipSnapshot,
) -> Result<(), AuthzError>
where
    I: IntoIterator<Item = EntityRef>,
{
    for entity in entities {
        match snapshot.owner_of(entity) {
            Some(owner) if owner == user_id => {}
            Some(_) => return Err(AuthzError::NotAuthorized { entity }),
            None => return Err(AuthzError::UnknownEntity(entity)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(owner: Uuid, other: Uuid) -> OwnershipSnapshot {
        OwnershipSnapshot::new()
            .with_board(1, owner)
            .with_board(2, other)
            .with_column(10, 1)
            .with_column(20, 2)
            .with_label(30, 1)
            .with_task(100, 1)
            .with_task(200, 2)
    }

    #[test]
    fn test_owner_passes_for_every_entity_kind() {
        let owner = Uuid::new_v4();
        let snap = snapshot(owner, Uuid::new_v4());

        let entities = [
            EntityRef::Board(1),
            EntityRef::Column(10),
            EntityRef::Label(30),
            EntityRef::Task(100),
        ];
        assert!(verify_ownership(owner, entities, &snap).is_ok());
    }

    #[test]
    fn test_foreign_column_rejected() {
        let owner = Uuid::new_v4();
        let snap = snapshot(owner, Uuid::new_v4());

        let result = verify_ownership(owner, [EntityRef::Task(100), EntityRef::Column(20)], &snap);
        assert_eq!(
            result,
            Err(AuthzError::NotAuthorized {
                entity: EntityRef::Column(20)
            })
        );
    }

    #[test]
    fn test_first_violation_is_reported() {
        let owner = Uuid::new_v4();
        let snap = snapshot(owner, Uuid::new_v4());

        let result = verify_ownership(owner, [EntityRef::Task(999), EntityRef::Task(200)], &snap);
        assert_eq!(result, Err(AuthzError::UnknownEntity(EntityRef::Task(999))));
    }

    #[test]
    fn test_entity_without_board_row_is_unknown() {
        let owner = Uuid::new_v4();
        let snap = OwnershipSnapshot::new().with_column(10, 5);

        assert_eq!(
            verify_ownership(owner, [EntityRef::Column(10)], &snap),
            Err(AuthzError::UnknownEntity(EntityRef::Column(10)))
        );
    }

    #[test]
    fn test_empty_entity_set_passes() {
        let snap = OwnershipSnapshot::new();
        assert!(verify_ownership(Uuid::new_v4(), [], &snap).is_ok());
    }

    #[test]
    fn test_authz_error_display() {
        let err = AuthzError::NotAuthorized {
            entity: EntityRef::Column(7),
        };
        assert_eq!(err.to_string(), "Not authorized to access column 7");

        let err = AuthzError::UnknownEntity(EntityRef::Task(3));
        assert_eq!(err.to_string(), "Unknown entity task 3");
    }
}
