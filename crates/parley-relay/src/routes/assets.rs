//! Serves uploaded assets when they are held in process memory.

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn serve_asset(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let asset = state
        .local_assets
        .as_ref()
        .and_then(|store| store.get(&key))
        .ok_or_else(|| ApiError::NotFound(format!("asset not found: {key}")))?;

    Ok(([(CONTENT_TYPE, asset.content_type)], asset.body).into_response())
}
