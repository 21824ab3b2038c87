//! Operator routes.
//!
//! - `POST /admin/update` - start a full reconciliation
//! - `POST /admin/update/:game` - start one game's reconciliation
//! - `GET /admin/block` - current block window
//! - `DELETE /admin/block` - clear the block window

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::{ApiError, ApiState};
use crate::admin::UpdateAck;
use crate::model::Game;
use crate::upstream::BlockStatus;

pub fn admin_routes(state: ApiState) -> Router {
    Router::new()
        .route("/admin/update", post(update_all))
        .route("/admin/update/:game", post(update_game))
        .route("/admin/block", get(block_status).delete(reset_block))
        .with_state(state)
}

async fn update_all(State(state): State<ApiState>) -> (StatusCode, Json<UpdateAck>) {
    (StatusCode::ACCEPTED, Json(state.admin.trigger_update_all()))
}

async fn update_game(
    State(state): State<ApiState>,
    Path(game): Path<String>,
) -> Result<(StatusCode, Json<UpdateAck>), ApiError> {
    let game: Game = game.parse()?;
    Ok((StatusCode::ACCEPTED, Json(state.admin.trigger_update(game))))
}

async fn block_status(State(state): State<ApiState>) -> Json<BlockStatus> {
    Json(state.admin.block_status())
}

async fn reset_block(State(state): State<ApiState>) -> Json<BlockStatus> {
    Json(state.admin.reset_block())
}
