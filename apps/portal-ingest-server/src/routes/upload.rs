//! Upload Routes
//!
//! Endpoints:
//! - POST /upload/resume - Store a PDF resume
//! - POST /upload/profile - Store a JPG/PNG profile image
//!
//! Both take a multipart form. The file is read from the first part named
//! after the category (`resume` / `profile`) or `file`; other parts are
//! ignored. Only one file is stored per request.

use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{header, HeaderMap, StatusCode},
    middleware,
    routing::post,
    Extension, Json, Router,
};
use futures::StreamExt;

use crate::auth::{require_bearer, Claims};
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::upload::{BodyError, IncomingFile, Rejection, UploadCategory, UploadResult};

// ============================================================================
// Router
// ============================================================================

/// Create the upload router
///
/// Each route's body limit is its file limit plus room for multipart
/// framing, so an oversized upload is cut off by the transport even if it
/// lies about its length.
pub fn router(state: &AppState) -> Router<AppState> {
    let limit = |category| {
        let bytes = state.validator().body_limit(category);
        DefaultBodyLimit::max(usize::try_from(bytes).unwrap_or(usize::MAX))
    };

    let router = Router::new()
        .route(
            "/resume",
            post(upload_resume).layer(limit(UploadCategory::Resume)),
        )
        .route(
            "/profile",
            post(upload_profile).layer(limit(UploadCategory::Profile)),
        );

    if state.verifier().is_some() {
        router.route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
    } else {
        router
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /upload/resume
async fn upload_resume(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResult>> {
    ingest(&state, UploadCategory::Resume, claims, &headers, multipart).await
}

/// POST /upload/profile
async fn upload_profile(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResult>> {
    ingest(&state, UploadCategory::Profile, claims, &headers, multipart).await
}

/// Validate then store the file part of one request
async fn ingest(
    state: &AppState,
    category: UploadCategory,
    claims: Option<Extension<Claims>>,
    headers: &HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResult>> {
    let validator = state.validator();
    let max_bytes = validator.rules(category).max_bytes;

    validator.check_request_length(category, content_length(headers))?;

    // Not a multipart request at all: there is no file in it
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(category = %category, error = %rejection, "Upload is not multipart");
        AppError::from(Rejection::NoFile)
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        if !is_file_field(category, &field) {
            continue;
        }

        let incoming = IncomingFile {
            media_type: field.content_type().map(str::to_string),
            file_name: field.file_name().map(str::to_string),
            declared_len: field
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok()),
            body: field,
        };

        let media_type = validator
            .validate(category, Some(&incoming))
            .inspect_err(|rejection| {
                if let Rejection::InvalidFormat { declared, .. } = rejection {
                    tracing::info!(
                        category = %category,
                        declared = declared.as_deref().unwrap_or("none"),
                        original_name = incoming.file_name.as_deref().unwrap_or(""),
                        "Rejected upload media type"
                    );
                }
            })?;

        let body = Box::pin(incoming.body.map(|chunk| chunk.map_err(body_error)));
        let stored = state
            .writer()
            .write(category, media_type, max_bytes, body)
            .await?;

        tracing::info!(
            category = %category,
            file_id = %stored.id,
            media_type = %stored.media_type,
            size = stored.size,
            original_name = incoming.file_name.as_deref().unwrap_or(""),
            uploader = claims.as_ref().map(|c| c.user_id.as_str()).unwrap_or("anonymous"),
            "File stored successfully"
        );

        return Ok(Json(UploadResult::from(&stored)));
    }

    Err(Rejection::NoFile.into())
}

// ============================================================================
// Helpers
// ============================================================================

/// Whether a multipart part carries the upload for `category`
fn is_file_field(category: UploadCategory, field: &Field<'_>) -> bool {
    let named = matches!(field.name(), Some(name) if name == category.as_str() || name == "file");
    // Plain text fields have neither a file name nor a content type
    named && (field.file_name().is_some() || field.content_type().is_some())
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Errors while looking for the next part happen before anything is stored
fn multipart_error(e: MultipartError, max_bytes: u64) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Rejection::TooLarge { max: max_bytes }.into()
    } else {
        AppError::Malformed(e.body_text())
    }
}

/// Errors while streaming a part's bytes
fn body_error(e: MultipartError) -> BodyError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        BodyError::LimitExceeded
    } else {
        BodyError::Interrupted(e.body_text())
    }
}
