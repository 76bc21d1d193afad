use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use common::is_valid_id;
use common::storage::BlobId;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v2/files/{id}",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download workflow content",
    description = "Streams a stored blob as an attachment. Authentication is checked before \
        anything else; an id that is not exactly 12 ASCII letters or digits is not found.",
    params(("id" = String, Path, description = "Blob ID")),
    responses(
        (status = 200, description = "Blob content", content_type = "application/octet-stream"),
        (status = 403, description = "Not authenticated (NOT_AUTHENTICATED, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Malformed id or no such blob (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn download_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    if !is_valid_id(&id) {
        return Err(not_found());
    }
    let blob_id = BlobId::parse(&id).map_err(|_| not_found())?;

    let size = state.blob_store.size(&blob_id).await?;
    let reader = state.blob_store.get_stream(&blob_id).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(blob_id.as_str()),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

#[utoipa::path(
    get,
    path = "/api/v2/files/",
    tag = "Files",
    operation_id = "downloadFileWithoutId",
    summary = "Download without an id",
    description = "Always refused, even for authenticated callers.",
    responses(
        (status = 403, description = "Refused (NOT_AUTHENTICATED, TOKEN_INVALID, PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user), fields(user_id = auth_user.user_id))]
pub async fn download_without_id(auth_user: AuthUser) -> AppError {
    AppError::PermissionDenied
}

fn not_found() -> AppError {
    AppError::NotFound("Not found.".into())
}

/// Build an attachment `Content-Disposition` value carrying the stored name
/// in RFC 5987 form.
fn content_disposition_value(filename: &str) -> String {
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename*=UTF-8''{encoded}")
}
