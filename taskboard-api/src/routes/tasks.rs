/// Task endpoints
///
/// # Endpoints
///
/// - `POST /v1/tasks` - Create a task at the end of a column
/// - `DELETE /v1/tasks/:id` - Delete a task and close the gap it leaves
/// - `POST /v1/tasks/reorder` - Move a batch of tasks atomically
///
/// # Reorder
///
/// ```text
/// POST /v1/tasks/reorder
/// Authorization: Bearer eyJ...
/// Content-Type: application/json
///
/// {
///   "moves": [
///     { "task_id": 12, "to_column": 3, "to_position": 0 },
///     { "task_id": 15, "to_column": 3, "to_position": 1 }
///   ]
/// }
/// ```
///
/// Answers `200 {"status": "ok"}`. The batch is all or nothing:
///
/// - `400` malformed body, duplicate task ids, or a move across boards
/// - `401` missing or invalid token
/// - `403 {"detail": "Forbidden"}` any task or column owned by someone else
/// - `404` unknown task or column
/// - `409` with `Retry-After: 1` when a concurrent update won; resubmit as is

use std::collections::BTreeSet;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{
        authorization::{verify_ownership, EntityRef, OwnershipSnapshot},
        middleware::AuthContext,
    },
    models::{
        board::Board,
        column::Column,
        label::Label,
        task::{CreateTask, Task},
        user::User,
    },
    reorder::TaskMove,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub column_id: i64,

    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: String,

    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub label_ids: Vec<i64>,

    #[serde(default)]
    pub assignee_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub moves: Vec<TaskMove>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReorderResponse {
    pub status: String,
}

/// Creates a task at `max(position) + 1` of its column
///
/// The column must belong to one of the caller's boards; that is checked
/// before anything in the body is looked at. Labels must then belong to the
/// same board and assignees must be registered users.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let column = Column::find_by_id(&state.db, req.column_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("column {} not found", req.column_id)))?;
    let board = Board::find_by_id(&state.db, column.board_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("column {} not found", req.column_id)))?;

    let ownership = OwnershipSnapshot::new()
        .with_board(board.id, board.owner_id)
        .with_column(column.id, column.board_id);
    verify_ownership(auth.user_id, [EntityRef::Column(column.id)], &ownership)?;

    let label_ids: Vec<i64> = req.label_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let labels = Label::find_by_ids(&state.db, &label_ids).await?;
    if labels.len() != label_ids.len() {
        return Err(ApiError::BadRequest("Unknown label".to_string()));
    }
    if let Some(foreign) = labels.iter().find(|label| label.board_id != board.id) {
        return Err(ApiError::BadRequest(format!(
            "label {} does not belong to board {}",
            foreign.id, board.id
        )));
    }

    let assignee_ids: Vec<Uuid> = req.assignee_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let existing = User::count_existing(&state.db, &assignee_ids).await?;
    if existing != assignee_ids.len() as i64 {
        return Err(ApiError::BadRequest("Unknown assignee".to_string()));
    }

    let task = Task::create(
        &state.db,
        CreateTask {
            board_id: board.id,
            column_id: column.id,
            title: req.title.trim().to_string(),
            description: req.description,
            due_at: req.due_at,
            label_ids,
            assignee_ids,
        },
    )
    .await?;

    tracing::info!(task_id = task.id, column_id = column.id, position = task.position, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

/// Deletes a task and renumbers the rest of its column
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.reorder.delete_task(auth.user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Applies a batch of moves in one transaction
pub async fn reorder_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> ApiResult<Json<ReorderResponse>> {
    let Json(req) = payload?;

    let outcome = state.reorder.reorder_tasks(auth.user_id, &req.moves).await?;
    tracing::debug!(
        user_id = %auth.user_id,
        columns = ?outcome.columns,
        updated_tasks = outcome.updated_tasks,
        "Reorder request applied"
    );

    Ok(Json(ReorderResponse {
        status: "ok".to_string(),
    }))
}
