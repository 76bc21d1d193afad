use axum::{
    Json,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use common::storage::{BlobId, BlobStore, BoxReader};
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::base_url::BaseUrl;
use crate::models::root::MetadataResponse;
use crate::models::shared::{PageQuery, PageWindow, file_size_message};
use crate::models::workflow::{WorkflowListResponse, WorkflowResponse, WorkflowUpload};
use crate::routes::paths;
use crate::service::workflow::WorkflowService;
use crate::state::AppState;
use crate::utils::policy::Action;

const CONTENT_FIELD: &str = "content";
const NO_FILE: &str = "No file was submitted.";

/// Leaves room for multipart framing around a maximum-size upload.
pub fn upload_body_limit(max_content_size: u64) -> DefaultBodyLimit {
    let limit = max_content_size.saturating_add(1024 * 1024);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    get,
    path = "/api/v2/workflows/",
    tag = "Workflows",
    operation_id = "listWorkflows",
    summary = "List workflows",
    description = "Staff see every workflow; everyone else only their own. Ordered by id.",
    params(PageQuery),
    responses(
        (status = 200, description = "Workflow page", body = WorkflowListResponse),
        (status = 403, description = "Not authenticated (NOT_AUTHENTICATED, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Page out of range (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base), fields(user_id = auth_user.user_id, page = query.page))]
pub async fn list_workflows(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: BaseUrl,
    Query(query): Query<PageQuery>,
) -> Result<Json<WorkflowListResponse>, AppError> {
    let per_page = state.config.pagination.page_size;
    let page = query.page.unwrap_or(1);
    let (items, total) = WorkflowService::new(&state.db, &*state.blob_store)
        .list(&auth_user, page, per_page)
        .await?;
    let window = PageWindow::resolve(Some(page), per_page, total, &base.join(paths::WORKFLOWS))?;

    Ok(Json(WorkflowListResponse {
        count: total,
        next: window.next,
        previous: window.previous,
        results: items
            .into_iter()
            .map(|w| WorkflowResponse::new(w, &base))
            .collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v2/workflows/",
    tag = "Workflows",
    operation_id = "createWorkflow",
    summary = "Upload a new workflow",
    description = "The `content` file part is required. The owner is always the caller; \
        `id` and `owner` parts are ignored.",
    request_body(content = WorkflowUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Workflow created", body = WorkflowResponse),
        (status = 400, description = "Missing, empty or oversized content (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Not authenticated (NOT_AUTHENTICATED, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Identifier collision, retry (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base, request), fields(user_id = auth_user.user_id))]
pub async fn create_workflow(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: BaseUrl,
    request: Request,
) -> Result<impl IntoResponse, AppError> {
    let content = read_content(request, &state)
        .await?
        .ok_or_else(missing_content)?;

    let model = WorkflowService::new(&state.db, &*state.blob_store)
        .create(&auth_user, content)
        .await?;

    Ok((StatusCode::CREATED, Json(WorkflowResponse::new(model, &base))))
}

#[utoipa::path(
    get,
    path = "/api/v2/workflows/{id}/",
    tag = "Workflows",
    operation_id = "getWorkflow",
    summary = "Get a workflow",
    description = "Any authenticated principal may retrieve any single workflow.",
    params(("id" = String, Path, description = "Workflow ID")),
    responses(
        (status = 200, description = "Workflow", body = WorkflowResponse),
        (status = 403, description = "Not authenticated (NOT_AUTHENTICATED, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No such workflow (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base), fields(user_id = auth_user.user_id))]
pub async fn get_workflow(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: BaseUrl,
    Path(id): Path<String>,
) -> Result<Json<WorkflowResponse>, AppError> {
    let model = WorkflowService::new(&state.db, &*state.blob_store)
        .find(&auth_user, Action::Retrieve, &id)
        .await?;

    Ok(Json(WorkflowResponse::new(model, &base)))
}

#[utoipa::path(
    put,
    path = "/api/v2/workflows/{id}/",
    tag = "Workflows",
    operation_id = "replaceWorkflow",
    summary = "Replace a workflow's content",
    description = "The `content` file part is required. The previous blob is deleted once \
        the new reference is committed. Workflows the caller may not modify are reported \
        as not found.",
    params(("id" = String, Path, description = "Workflow ID")),
    request_body(content = WorkflowUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Workflow updated", body = WorkflowResponse),
        (status = 400, description = "Missing, empty or oversized content (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Not authenticated, or staff acting on a workflow they do not own (NOT_AUTHENTICATED, TOKEN_INVALID, PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such workflow in the caller's scope (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base, request), fields(user_id = auth_user.user_id))]
pub async fn replace_workflow(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: BaseUrl,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<WorkflowResponse>, AppError> {
    let service = WorkflowService::new(&state.db, &*state.blob_store);
    service
        .ensure_writable(&auth_user, Action::Update, &id)
        .await?;

    let content = read_content(request, &state)
        .await?
        .ok_or_else(missing_content)?;
    let model = service
        .update_content(&auth_user, Action::Update, &id, content)
        .await?;

    Ok(Json(WorkflowResponse::new(model, &base)))
}

#[utoipa::path(
    patch,
    path = "/api/v2/workflows/{id}/",
    tag = "Workflows",
    operation_id = "patchWorkflow",
    summary = "Partially update a workflow",
    description = "Like PUT, but `content` is optional. Without it the workflow is returned unchanged.",
    params(("id" = String, Path, description = "Workflow ID")),
    request_body(content = WorkflowUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Workflow after the update", body = WorkflowResponse),
        (status = 400, description = "Empty or oversized content (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Not authenticated, or staff acting on a workflow they do not own (NOT_AUTHENTICATED, TOKEN_INVALID, PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such workflow in the caller's scope (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base, request), fields(user_id = auth_user.user_id))]
pub async fn patch_workflow(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: BaseUrl,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<WorkflowResponse>, AppError> {
    let service = WorkflowService::new(&state.db, &*state.blob_store);
    let current = service
        .ensure_writable(&auth_user, Action::PartialUpdate, &id)
        .await?;

    let model = match read_content(request, &state).await? {
        Some(content) => {
            service
                .update_content(&auth_user, Action::PartialUpdate, &id, content)
                .await?
        }
        None => current,
    };

    Ok(Json(WorkflowResponse::new(model, &base)))
}

#[utoipa::path(
    delete,
    path = "/api/v2/workflows/{id}/",
    tag = "Workflows",
    operation_id = "deleteWorkflow",
    summary = "Delete a workflow",
    description = "Removes the record, then its content blob.",
    params(("id" = String, Path, description = "Workflow ID")),
    responses(
        (status = 204, description = "Workflow deleted"),
        (status = 403, description = "Not authenticated, or staff acting on a workflow they do not own (NOT_AUTHENTICATED, TOKEN_INVALID, PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such workflow in the caller's scope (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_workflow(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    WorkflowService::new(&state.db, &*state.blob_store)
        .delete(&auth_user, &id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    options,
    path = "/api/v2/workflows/",
    tag = "Workflows",
    operation_id = "workflowListOptions",
    summary = "Describe the workflow collection",
    responses(
        (status = 200, description = "Allowed methods in the `Allow` header", body = MetadataResponse),
        (status = 403, description = "Not authenticated (NOT_AUTHENTICATED, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn workflow_list_options(_auth_user: AuthUser) -> impl IntoResponse {
    (
        [(header::ALLOW, "GET, POST, HEAD, OPTIONS")],
        Json(MetadataResponse::new(
            "Workflow List",
            "Workflows owned by the caller, or all of them for staff.",
        )),
    )
}

#[utoipa::path(
    options,
    path = "/api/v2/workflows/{id}/",
    tag = "Workflows",
    operation_id = "workflowDetailOptions",
    summary = "Describe a workflow",
    params(("id" = String, Path, description = "Workflow ID")),
    responses(
        (status = 200, description = "Allowed methods in the `Allow` header", body = MetadataResponse),
        (status = 403, description = "Not authenticated (NOT_AUTHENTICATED, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn workflow_detail_options(_auth_user: AuthUser) -> impl IntoResponse {
    (
        [(header::ALLOW, "GET, PUT, PATCH, DELETE, HEAD, OPTIONS")],
        Json(MetadataResponse::new(
            "Workflow Instance",
            "A single workflow. Only its owner may change it.",
        )),
    )
}

fn missing_content() -> AppError {
    AppError::FieldValidation {
        field: CONTENT_FIELD,
        message: NO_FILE.into(),
    }
}

/// Store the `content` part of a multipart body, if there is one.
///
/// Non-multipart bodies carry no content. Other parts are ignored, as is any
/// repeated `content` part. If reading the rest of the body fails after the
/// content was stored, the blob is removed again.
async fn read_content(request: Request, state: &AppState) -> Result<Option<BlobId>, AppError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));
    if !is_multipart {
        return Ok(None);
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?;

    let mut stored: Option<BlobId> = None;
    let result = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
        {
            if field.name() != Some(CONTENT_FIELD) || stored.is_some() {
                continue;
            }
            if field.file_name().is_none() {
                return Err(AppError::FieldValidation {
                    field: CONTENT_FIELD,
                    message: "The submitted data was not a file. Check the encoding type on the form."
                        .into(),
                });
            }
            stored = Some(
                stream_field_to_store(
                    field,
                    &*state.blob_store,
                    state.config.storage.max_content_size,
                )
                .await?,
            );
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => Ok(stored),
        Err(e) => {
            if let Some(blob_id) = &stored {
                WorkflowService::new(&state.db, &*state.blob_store)
                    .discard_blob(blob_id)
                    .await;
            }
            Err(e)
        }
    }
}

/// Stream a multipart field to blob storage via a temp file.
///
/// An oversized upload is still read to the end so the error can report its
/// actual size; nothing reaches the store in that case.
async fn stream_field_to_store(
    mut field: axum::extract::multipart::Field<'_>,
    blob_store: &dyn BlobStore,
    max_size: u64,
) -> Result<BlobId, AppError> {
    let temp_path = std::env::temp_dir().join(format!("rehagoal-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                continue;
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        if total_size > max_size {
            return Err(AppError::FieldValidation {
                field: CONTENT_FIELD,
                message: file_size_message(total_size, max_size),
            });
        }
        if total_size == 0 {
            return Err(AppError::FieldValidation {
                field: CONTENT_FIELD,
                message: "The submitted file is empty.".into(),
            });
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;
        drop(temp_file);

        let file = tokio::fs::File::open(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let reader: BoxReader = Box::new(file);
        let blob_id = blob_store.put_stream(reader).await?;
        tracing::debug!(blob_id = %blob_id, size = total_size, "Stored upload");

        Ok(blob_id)
    }
    .await;

    // Best effort.
    let _ = tokio::fs::remove_file(&temp_path).await;

    result
}
