//! Stored file retrieval
//!
//! Serves uploads back by the url returned from the upload routes.

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::upload::UploadCategory;

/// Create the retrieval router
pub fn router() -> Router<AppState> {
    Router::new().route("/:category/:file_name", get(serve_file))
}

/// GET /host/:category/:file_name
async fn serve_file(
    State(state): State<AppState>,
    Path((category, file_name)): Path<(String, String)>,
) -> Result<Response> {
    let category: UploadCategory = category.parse().map_err(|_| AppError::NotFound)?;
    let (path, media_type) = state
        .writer()
        .resolve(category, &file_name)
        .ok_or(AppError::NotFound)?;

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound),
        Err(e) => return Err(e.into()),
    };
    let metadata = file.metadata().await?;

    let headers = [
        (header::CONTENT_TYPE, media_type.as_str().to_string()),
        (header::CONTENT_LENGTH, metadata.len().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", file_name),
        ),
        (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}
