/// Stored image serving
use crate::{
    context::AppContext,
    error::{DropError, DropResult},
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

/// Build upload-serving routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/uploads/:filename", get(get_upload))
}

/// GET /uploads/{filename}
///
/// Filenames are immutable once written, so the content is cacheable
/// forever.
async fn get_upload(
    State(ctx): State<AppContext>,
    Path(filename): Path<String>,
) -> DropResult<Response> {
    // Generated names never contain path separators or dot segments
    if filename.contains('/') || filename.contains("..") {
        return Err(DropError::NotFound(format!("No such upload: {}", filename)));
    }

    let (data, content_type) = ctx
        .blob_store
        .open(&filename)
        .await?
        .ok_or_else(|| DropError::NotFound(format!("No such upload: {}", filename)))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, data.len().to_string())
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from(data))
        .map_err(|e| DropError::Internal(format!("Failed to build response: {}", e)))
}
