/// Label endpoints
///
/// - `POST /v1/boards/:id/labels` - Add a label to an owned board
///
/// Colors are `#RRGGBB`; anything else is rejected with `422`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::boards::load_owned_board,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::label::{is_valid_color, Label},
};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLabelRequest {
    #[validate(length(min = 1, max = 40, message = "Name must be 1 to 40 characters"))]
    pub name: String,

    pub color: String,
}

pub async fn create_label(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<i64>,
    Json(req): Json<CreateLabelRequest>,
) -> ApiResult<(StatusCode, Json<Label>)> {
    req.validate()?;
    if !is_valid_color(&req.color) {
        return Err(ApiError::invalid_field("color", "Color must look like #RRGGBB"));
    }

    let board = load_owned_board(&state, auth.user_id, board_id).await?;
    let label = Label::create(&state.db, board.id, req.name.trim(), &req.color).await?;

    tracing::debug!(board_id = board.id, label_id = label.id, "Label created");
    Ok((StatusCode::CREATED, Json(label)))
}
