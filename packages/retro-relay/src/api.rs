use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use retro_core::sync::RelayStatus;
use serde::Serialize;

use crate::state::AppState;

const MAX_PATH_LEN: usize = 256;

/// Axum REST API routes.
///
///   GET    /status        -> health check (+ document and watcher counts)
///   GET    /db/{*path}    -> document at path, null when absent
///   PUT    /db/{*path}    -> replace document (a null body removes it)
///   DELETE /db/{*path}    -> remove document
pub fn api_router() -> Router<AppState> {
    Router::new().route("/status", get(status)).route(
        "/db/{*path}",
        get(get_document).put(put_document).delete(delete_document),
    )
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Normalize a document path: slash-separated segments of ASCII
/// alphanumerics, `-`, `_` and `.`, with no empty, `.` or `..` segments.
pub(crate) fn validate_path(raw: &str) -> Result<String, String> {
    let path = raw.trim_matches('/');
    if path.is_empty() {
        return Err("Empty document path".to_string());
    }
    if path.len() > MAX_PATH_LEN {
        return Err(format!("Document path longer than {} bytes", MAX_PATH_LEN));
    }
    for segment in path.split('/') {
        let valid = !segment.is_empty()
            && segment != "."
            && segment != ".."
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(format!("Invalid document path: {}", raw));
        }
    }
    Ok(path.to_string())
}

fn bad_path(message: String) -> ApiError {
    log::warn!("[retro.relay.api] {}", message);
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
}

pub async fn status(State(state): State<AppState>) -> Json<RelayStatus> {
    let actual_port = state.live_port.lock().map(|p| *p).unwrap_or(state.port);
    Json(RelayStatus {
        status: "running".to_string(),
        port: actual_port,
        documents: state.db.document_count(),
        watchers: state.db.watcher_count(),
    })
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let path = validate_path(&path).map_err(bad_path)?;
    Ok(Json(state.db.read(&path).unwrap_or(serde_json::Value::Null)))
}

pub async fn put_document(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Json(value): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    let path = validate_path(&path).map_err(bad_path)?;
    if value.is_null() {
        state.db.delete(&path);
    } else {
        state.db.write(&path, value);
    }
    log::debug!("[retro.relay.api] Wrote {}", path);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<StatusCode, ApiError> {
    let path = validate_path(&path).map_err(bad_path)?;
    state.db.delete(&path);
    log::debug!("[retro.relay.api] Removed {}", path);
    Ok(StatusCode::NO_CONTENT)
}
