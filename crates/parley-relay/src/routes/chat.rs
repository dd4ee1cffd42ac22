//! The streaming chat relay.
//!
//! One inbound turn produces exactly one upstream call. The upstream body is
//! passed through untouched; only the response headers are rewritten.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use parley_core::wire::{ChatTurnRequest, CONVERSATION_ID_HEADER, CONVERSATION_TOKEN_HEADER};

use crate::error::ApiError;
use crate::state::AppState;

const ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Upstream headers copied onto the relay response unchanged.
const ECHOED_HEADERS: [&str; 2] = [CONVERSATION_ID_HEADER, CONVERSATION_TOKEN_HEADER];

pub async fn relay_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatTurnRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let Some((bot_id, query)) = request.required_fields() else {
        return Err(ApiError::BadRequest(
            "bot_id and query are required".to_string(),
        ));
    };
    if request.mixes_continuity() {
        return Err(ApiError::BadRequest(
            "token and chat_history cannot be combined".to_string(),
        ));
    }

    tracing::info!(
        bot_id,
        query_len = query.len(),
        conv_id = request.conv_id.as_deref().unwrap_or("(none)"),
        has_token = request.token.is_some(),
        history_len = request.chat_history.as_ref().map_or(0, Vec::len),
        "forwarding chat turn"
    );

    let upstream = state.upstream.open_chat(&forwarded(request)).await?;

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-transform"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(ACCEL_BUFFERING, HeaderValue::from_static("no"));
    for name in ECHOED_HEADERS {
        if let Some(value) = upstream.headers().get(name) {
            headers.insert(HeaderName::from_static(name), value.clone());
        }
    }

    let body = Body::from_stream(upstream.bytes_stream());
    Ok((StatusCode::OK, headers, body).into_response())
}

/// The request as sent upstream: blank continuity fields are dropped.
fn forwarded(mut request: ChatTurnRequest) -> ChatTurnRequest {
    request.conv_id = request.conv_id.filter(|c| !c.is_empty());
    request.token = request.token.filter(|t| !t.is_empty());
    request
}
