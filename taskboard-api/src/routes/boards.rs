/// Board endpoints
///
/// # Endpoints
///
/// - `GET /v1/boards` - Boards owned by the caller, newest first
/// - `POST /v1/boards` - Create an empty board
/// - `POST /v1/boards/seed` - Create a board with default columns and labels
/// - `GET /v1/boards/:id` - Board with columns, tasks, and labels
/// - `DELETE /v1/boards/:id` - Delete a board and everything on it
///
/// Every endpoint acting on an existing board checks ownership first and
/// answers `403` for someone else's board.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::{
        authorization::{verify_ownership, EntityRef, OwnershipSnapshot},
        middleware::AuthContext,
    },
    models::board::{Board, BoardDetail},
};
use uuid::Uuid;
use validator::Validate;

/// Name given to a seeded board when the request has none
pub const DEFAULT_BOARD_NAME: &str = "My Board";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1 to 120 characters"))]
    pub name: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SeedBoardRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be 1 to 120 characters"))]
    pub name: Option<String>,
}

/// Loads a board and checks that `user_id` owns it
///
/// # Errors
///
/// - `404` if the board does not exist
/// - `403` if it belongs to another user
pub(crate) async fn load_owned_board(
    state: &AppState,
    user_id: Uuid,
    board_id: i64,
) -> ApiResult<Board> {
    let board = Board::find_by_id(&state.db, board_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("board {} not found", board_id)))?;

    let snapshot = OwnershipSnapshot::new().with_board(board.id, board.owner_id);
    verify_ownership(user_id, [EntityRef::Board(board.id)], &snapshot)?;

    Ok(board)
}

pub async fn list_boards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Board>>> {
    let boards = Board::list_by_owner(&state.db, auth.user_id).await?;
    Ok(Json(boards))
}

pub async fn create_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    req.validate()?;

    let board = Board::create(&state.db, auth.user_id, req.name.trim()).await?;
    tracing::info!(board_id = board.id, user_id = %auth.user_id, "Board created");

    Ok((StatusCode::CREATED, Json(board)))
}

/// First-use seeding
///
/// Creates a board named `name` (or "My Board") with the columns
/// `To Do`, `In Progress`, `Done` and the labels `Bug`, `Feature`, `Chore`.
/// The body may be omitted; a body that is present must be valid JSON.
pub async fn seed_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<BoardDetail>)> {
    let req = parse_seed_request(&body)?;
    req.validate()?;

    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .unwrap_or(DEFAULT_BOARD_NAME);

    let detail = Board::seed_default(&state.db, auth.user_id, name).await?;
    tracing::info!(board_id = detail.board.id, user_id = %auth.user_id, "Default board seeded");

    Ok((StatusCode::CREATED, Json(detail)))
}

/// Empty or whitespace-only bodies mean "all defaults"
fn parse_seed_request(body: &[u8]) -> ApiResult<SeedBoardRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SeedBoardRequest::default());
    }
    let Json(req) = Json::<SeedBoardRequest>::from_bytes(body)?;
    Ok(req)
}

pub async fn get_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<i64>,
) -> ApiResult<Json<BoardDetail>> {
    let board = load_owned_board(&state, auth.user_id, board_id).await?;
    let detail = Board::load_detail(&state.db, board).await?;
    Ok(Json(detail))
}

pub async fn delete_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<i64>,
) -> ApiResult<StatusCode> {
    load_owned_board(&state, auth.user_id, board_id).await?;

    if !Board::delete(&state.db, board_id).await? {
        return Err(ApiError::NotFound(format!("board {} not found", board_id)));
    }

    tracing::info!(board_id, user_id = %auth.user_id, "Board deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("  \n")]
    #[case::empty_object("{}")]
    fn test_seed_request_defaults(#[case] body: &str) {
        let req = parse_seed_request(body.as_bytes()).unwrap();
        assert_eq!(req.name, None);
    }

    #[test]
    fn test_seed_request_with_name() {
        let req = parse_seed_request(br#"{"name": "Sprint"}"#).unwrap();
        assert_eq!(req.name.as_deref(), Some("Sprint"));
    }

    #[rstest]
    #[case::syntax("{not json")]
    #[case::wrong_type(r#"{"name": 5}"#)]
    fn test_seed_request_malformed_is_bad_request(#[case] body: &str) {
        let err = parse_seed_request(body.as_bytes()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
