/// Position normalizer
///
/// Pure algorithm computing the final, gap-free order of every column touched
/// by a move batch.
///
/// # Ordering Rules
///
/// For each column independently:
///
/// 1. Resident tasks (tasks already in the column and not part of the batch)
///    keep their relative order: stored position ascending, ties by creation
///    time, then by task ID. This is the order the board view lists them in.
/// 2. Moved tasks are inserted at their requested index, processed in
///    ascending target order with ties broken by request order. A moved task
///    therefore lands in front of the resident currently holding its index.
/// 3. Targets past the end clamp to "last"; negative targets become 0.
/// 4. The resulting list is re-indexed `0..n-1`.
///
/// ```text
/// column B: [T4@0]         move T2 -> (B, 0)
/// result:   [T2@0, T4@1]   T2 emitted (moved), T4 emitted (0 -> 1)
/// ```
///
/// Only tasks whose column or position changes are emitted; moved tasks are
/// always emitted since their column id must be written.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::store::TaskSnapshot;

/// A task already in a column that is not part of the move batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidentTask {
    /// Task ID
    pub task_id: i64,

    /// Stored position
    pub position: i32,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl ResidentTask {
    /// Resident with no known creation time, so equal positions fall back to ID order
    pub fn new(task_id: i64, position: i32) -> Self {
        Self {
            task_id,
            position,
            created_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    fn sort_key(&self) -> (i32, DateTime<Utc>, i64) {
        (self.position, self.created_at, self.task_id)
    }
}

impl From<&TaskSnapshot> for ResidentTask {
    fn from(task: &TaskSnapshot) -> Self {
        Self {
            task_id: task.id,
            position: task.position,
            created_at: task.created_at,
        }
    }
}

/// A task arriving in a column as part of the move batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingTask {
    /// Task ID
    pub task_id: i64,

    /// Requested index in the target column (negative means 0)
    pub target_position: i64,

    /// Index of the move inside the request, used to break ties
    pub request_order: usize,
}

/// Everything the normalizer needs to know about one affected column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPlan {
    /// Tasks staying in the column
    pub residents: Vec<ResidentTask>,

    /// Tasks moved into (or within) the column
    pub incoming: Vec<IncomingTask>,
}

impl ColumnPlan {
    /// Total number of tasks the column holds after the batch
    pub fn len(&self) -> usize {
        self.residents.len() + self.incoming.len()
    }

    /// Returns true when the column ends up empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single row write produced by normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionUpdate {
    /// Task to update
    pub task_id: i64,

    /// Column the task ends up in
    pub column_id: i64,

    /// Zero-based position within that column
    pub position: i32,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Resident(ResidentTask),
    Incoming(IncomingTask),
}

impl Slot {
    fn task_id(&self) -> i64 {
        match self {
            Slot::Resident(task) => task.task_id,
            Slot::Incoming(task) => task.task_id,
        }
    }
}

fn clamp_target(target: i64, len: usize) -> usize {
    usize::try_from(target.max(0)).map_or(len, |index| index.min(len))
}

fn ordered_slots(plan: &ColumnPlan) -> Vec<Slot> {
    let mut residents = plan.residents.clone();
    residents.sort_by_key(ResidentTask::sort_key);

    let mut incoming = plan.incoming.clone();
    incoming.sort_by_key(|task| (task.target_position.max(0), task.request_order));

    let mut slots: Vec<Slot> = residents.into_iter().map(Slot::Resident).collect();
    let mut previous: Option<usize> = None;

    for task in incoming {
        let mut index = clamp_target(task.target_position, slots.len());
        if let Some(previous) = previous {
            // Equal targets keep request order instead of stacking in reverse
            index = index.max(previous + 1);
        }
        slots.insert(index, Slot::Incoming(task));
        previous = Some(index);
    }

    slots
}

/// Returns the final task order of a single column
///
/// # Example
///
/// ```
/// use taskboard_shared::reorder::normalizer::{order_column, ColumnPlan, IncomingTask, ResidentTask};
///
/// let plan = ColumnPlan {
///     residents: vec![ResidentTask::new(4, 0)],
///     incoming: vec![IncomingTask { task_id: 2, target_position: 0, request_order: 0 }],
/// };
///
/// assert_eq!(order_column(&plan), vec![2, 4]);
/// ```
pub fn order_column(plan: &ColumnPlan) -> Vec<i64> {
    ordered_slots(plan).iter().map(Slot::task_id).collect()
}

/// Normalizes one column, returning the writes needed to reach its final order
pub fn normalize_column(column_id: i64, plan: &ColumnPlan) -> Vec<PositionUpdate> {
    ordered_slots(plan)
        .into_iter()
        .zip(0_i32..)
        .filter_map(|(slot, position)| match slot {
            Slot::Resident(task) if task.position == position => None,
            _ => Some(PositionUpdate {
                task_id: slot.task_id(),
                column_id,
                position,
            }),
        })
        .collect()
}

/// Normalizes every affected column of a batch
///
/// Columns are processed independently and in ascending ID order. Every
/// column in `plans` is normalized, including columns that only lost tasks.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use taskboard_shared::reorder::normalizer::{normalize, ColumnPlan, IncomingTask, ResidentTask};
///
/// let mut plans = BTreeMap::new();
/// plans.insert(1, ColumnPlan {
///     residents: vec![
///         ResidentTask::new(1, 0),
///         ResidentTask::new(3, 2),
///     ],
///     incoming: vec![],
/// });
/// plans.insert(2, ColumnPlan {
///     residents: vec![ResidentTask::new(4, 0)],
///     incoming: vec![IncomingTask { task_id: 2, target_position: 0, request_order: 0 }],
/// });
///
/// let updates = normalize(&plans);
/// assert_eq!(updates[&1].len(), 1); // task 3 closes the gap
/// assert_eq!(updates[&2].len(), 2); // task 2 arrives, task 4 shifts down
/// ```
pub fn normalize(plans: &BTreeMap<i64, ColumnPlan>) -> BTreeMap<i64, Vec<PositionUpdate>> {
    plans
        .iter()
        .map(|(column_id, plan)| (*column_id, normalize_column(*column_id, plan)))
        .collect()
}
