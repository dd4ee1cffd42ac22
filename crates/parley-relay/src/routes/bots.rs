use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use parley_core::error::CoreError;
use parley_core::models::bot::{Bot, BotPatch, NewBot};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct Deleted {
    success: bool,
}

pub async fn list_bots(State(state): State<AppState>) -> Result<Json<Vec<Bot>>, ApiError> {
    Ok(Json(state.bots.list().await?))
}

pub async fn get_bot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Bot>, ApiError> {
    Ok(Json(state.bots.get(id).await?))
}

pub async fn create_bot(
    State(state): State<AppState>,
    payload: Result<Json<NewBot>, JsonRejection>,
) -> Result<(StatusCode, Json<Bot>), ApiError> {
    let Json(input) = payload?;
    let bot = Bot::create(input).map_err(|e| match e {
        CoreError::MissingField(_) => {
            ApiError::BadRequest("name and bot_uuid are required".to_string())
        }
        other => other.into(),
    })?;

    state.bots.put(&bot).await?;
    tracing::info!(id = %bot.id, name = %bot.name, "bot created");
    Ok((StatusCode::CREATED, Json(bot)))
}

pub async fn update_bot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<BotPatch>, JsonRejection>,
) -> Result<Json<Bot>, ApiError> {
    let Json(patch) = payload?;
    let mut bot = state.bots.get(id).await?;
    bot.apply(patch)?;
    state.bots.put(&bot).await?;
    tracing::info!(id = %bot.id, "bot updated");
    Ok(Json(bot))
}

/// Delete a bot along with its hosted logo. A logo that cannot be removed
/// is logged and left behind; it does not block the delete.
pub async fn delete_bot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Deleted>, ApiError> {
    let bot = state.bots.get(id).await?;

    if !bot.logo_url.is_empty()
        && let Err(e) = state.assets.remove(&bot.logo_url).await
    {
        tracing::warn!(id = %id, error = %e, "failed to remove bot logo");
    }

    state.bots.delete(id).await?;
    tracing::info!(id = %id, "bot deleted");
    Ok(Json(Deleted { success: true }))
}
