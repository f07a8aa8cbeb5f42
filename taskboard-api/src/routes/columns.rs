/// Column endpoints
///
/// - `POST /v1/boards/:id/columns` - Append a column to an owned board
///
/// New columns land after the last one (`max(position) + 1`).

use crate::{app::AppState, error::ApiResult, routes::boards::load_owned_board};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{auth::middleware::AuthContext, models::column::Column};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateColumnRequest {
    #[validate(length(min = 1, max = 80, message = "Name must be 1 to 80 characters"))]
    pub name: String,
}

pub async fn create_column(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<i64>,
    Json(req): Json<CreateColumnRequest>,
) -> ApiResult<(StatusCode, Json<Column>)> {
    req.validate()?;

    let board = load_owned_board(&state, auth.user_id, board_id).await?;
    let column = Column::create(&state.db, board.id, req.name.trim()).await?;

    tracing::debug!(board_id = board.id, column_id = column.id, position = column.position, "Column created");
    Ok((StatusCode::CREATED, Json(column)))
}
