use crate::state::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Reference scheme the browser embeds in `file_url` parts
pub const REFERENCE_SCHEME: &str = "upload://";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    reference: String,
    name: String,
    mime_type: String,
    size: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// Keep the extension, drop anything that could escape the uploads directory
fn stored_name(id: &Uuid, original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));
    match extension {
        Some(ext) => format!("{}.{}", id, ext.to_ascii_lowercase()),
        None => id.to_string(),
    }
}

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return error_response(StatusCode::BAD_REQUEST, "No file in upload"),
        Err(e) => return error_response(e.status(), e.body_text()),
    };

    let name = field.file_name().unwrap_or("upload").to_string();
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = match field.bytes().await {
        Ok(data) => data,
        Err(e) => {
            warn!("Rejected upload {}: {}", name, e.body_text());
            return error_response(e.status(), e.body_text());
        }
    };

    let max_bytes = state.uploads.max_bytes;
    if data.len() > max_bytes {
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("File exceeds the {} byte limit", max_bytes),
        );
    }

    let id = Uuid::new_v4();
    let file_name = stored_name(&id, &name);
    let dir = &state.uploads.dir;
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        error!("Failed to create upload directory {}: {}", dir.display(), e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Could not store upload");
    }
    if let Err(e) = tokio::fs::write(dir.join(&file_name), &data).await {
        error!("Failed to write upload {}: {}", file_name, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Could not store upload");
    }

    info!(%name, %mime_type, size = data.len(), "stored upload");
    Json(UploadResponse {
        reference: format!("{}{}", REFERENCE_SCHEME, file_name),
        name,
        mime_type,
        size: data.len(),
    })
    .into_response()
}

pub fn routes(state: AppState) -> Router {
    // Room for multipart framing around the largest accepted file
    let body_limit = state.uploads.max_bytes.saturating_add(64 * 1024);
    Router::new()
        .route("/api/upload", post(upload))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
