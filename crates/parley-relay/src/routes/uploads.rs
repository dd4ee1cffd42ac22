//! Logo uploads to the asset store.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use parley_core::s3_keys;

use crate::error::ApiError;
use crate::state::AppState;

pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

/// Request body cap for the upload route: the logo plus multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_LOGO_BYTES + 64 * 1024;

/// Accepted content types and the extension stored with each.
const LOGO_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
];

#[derive(Serialize)]
pub struct Uploaded {
    pub url: String,
}

fn logo_extension(content_type: &str) -> Option<&'static str> {
    LOGO_TYPES
        .iter()
        .find(|(ty, _)| *ty == content_type)
        .map(|(_, ext)| *ext)
}

/// Accept a multipart form with a `file` field and return its public URL.
pub async fn upload_logo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Uploaded>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let extension = logo_extension(&content_type).ok_or_else(|| {
            ApiError::BadRequest("Please upload a PNG, JPG, GIF, WebP, or SVG image.".to_string())
        })?;

        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("file is empty".to_string()));
        }
        if data.len() > MAX_LOGO_BYTES {
            return Err(ApiError::BadRequest(
                "File size must be under 2MB.".to_string(),
            ));
        }

        let key = s3_keys::bot_logo(
            jiff::Timestamp::now().as_millisecond(),
            Uuid::new_v4(),
            extension,
        );
        let url = state.assets.upload(&key, data.to_vec(), &content_type).await?;
        return Ok(Json(Uploaded { url }));
    }

    Err(ApiError::BadRequest("missing file field".to_string()))
}
