//! Result query routes.
//!
//! - `GET /` - service description
//! - `GET /api` - supported game codes
//! - `GET /api/:game` - all stored results, newest first
//! - `GET /api/:game/latest` - newest stored result
//! - `GET /api/:game/:contest` - one result

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use super::{ApiError, ApiState};
use crate::model::{DrawResult, Game, ResultId};

pub fn query_routes(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api", get(list_games))
        .route("/api/:game", get(results_by_game))
        .route("/api/:game/:contest", get(result_by_contest))
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "games": "/api",
            "results": "/api/{game}",
            "latest": "/api/{game}/latest",
            "contest": "/api/{game}/{contest}",
            "blockStatus": "/admin/block",
            "update": "/admin/update",
        },
    }))
}

async fn list_games() -> Json<Vec<&'static str>> {
    Json(Game::codes())
}

async fn results_by_game(
    State(state): State<ApiState>,
    Path(game): Path<String>,
) -> Result<Json<Vec<DrawResult>>, ApiError> {
    let game: Game = game.parse()?;
    Ok(Json(state.store.find_by_game(game).await?))
}

/// `contest` is either a number or the literal `latest`.
async fn result_by_contest(
    State(state): State<ApiState>,
    Path((game, contest)): Path<(String, String)>,
) -> Result<Json<DrawResult>, ApiError> {
    let game: Game = game.parse()?;

    if contest == "latest" {
        return state
            .store
            .find_latest_by_game(game)
            .await?
            .map(Json)
            .ok_or_else(|| ApiError::NotFound(format!("no results stored for {game}")));
    }

    let number: u32 = contest
        .parse()
        .map_err(|_| ApiError::InvalidContest(contest.clone()))?;
    state
        .store
        .find_by_id(ResultId::new(game, number))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("{game} contest {number} not found")))
}
