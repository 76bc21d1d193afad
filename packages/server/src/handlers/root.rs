use axum::Json;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::base_url::BaseUrl;
use crate::models::root::ApiRootResponse;
use crate::routes::paths;

/// Public landing page; intentionally empty.
pub async fn index() -> &'static str {
    ""
}

#[utoipa::path(
    get,
    path = "/api/v2/",
    tag = "Root",
    operation_id = "apiRoot",
    summary = "Browse the API",
    description = "Links to the collections. Staff only.",
    responses(
        (status = 200, description = "Collection links", body = ApiRootResponse),
        (status = 403, description = "Not authenticated or not staff (NOT_AUTHENTICATED, TOKEN_INVALID, PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(auth_user, base), fields(user_id = auth_user.user_id))]
pub async fn api_root(
    auth_user: AuthUser,
    base: BaseUrl,
) -> Result<Json<ApiRootResponse>, AppError> {
    if !auth_user.is_staff {
        return Err(AppError::PermissionDenied);
    }

    Ok(Json(ApiRootResponse {
        users: base.join(paths::USERS),
        workflows: base.join(paths::WORKFLOWS),
    }))
}

/// Anything under the retired `/api/v1/` prefix.
pub async fn gone() -> AppError {
    AppError::Gone
}
