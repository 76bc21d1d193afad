use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use sea_orm::{EntityTrait, PaginatorTrait, QueryOrder};
use tracing::instrument;

use crate::entity::{user, user_profile};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::base_url::BaseUrl;
use crate::models::root::MetadataResponse;
use crate::models::shared::{PageQuery, PageWindow};
use crate::models::user::{ProfileListResponse, ProfileResponse};
use crate::routes::paths;
use crate::service::identity::IdentityService;
use crate::state::AppState;
use crate::utils::policy::{Action, require_profile_access};

const ALLOW: &str = "GET, HEAD, OPTIONS";

#[utoipa::path(
    get,
    path = "/api/v2/users/",
    tag = "Users",
    operation_id = "listProfiles",
    summary = "List user profiles",
    description = "Paginated list of all profiles, newest principal first. Staff only.",
    params(PageQuery),
    responses(
        (status = 200, description = "Profile page", body = ProfileListResponse),
        (status = 403, description = "Not authenticated or not staff (NOT_AUTHENTICATED, TOKEN_INVALID, PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Page out of range (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, base), fields(user_id = auth_user.user_id, page = query.page))]
pub async fn list_profiles(
    auth_user: AuthUser,
    State(state): State<AppState>,
    base: BaseUrl,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfileListResponse>, AppError> {
    require_profile_access(&auth_user, Action::List)?;

    let per_page = state.config.pagination.page_size;
    let paginator = user::Entity::find()
        .order_by_desc(user::Column::DateJoined)
        .order_by_desc(user::Column::Id)
        .paginate(&state.db, per_page);
    let total = paginator.num_items().await?;
    let window = PageWindow::resolve(query.page, per_page, total, &base.join(paths::USERS))?;
    let users = paginator.fetch_page(window.page - 1).await?;

    let identity = IdentityService::new(&state.db);
    let mut results = Vec::with_capacity(users.len());
    for user in &users {
        let profile = identity.resolve_profile(user.id).await?;
        results.push(ProfileResponse::new(profile, user));
    }

    Ok(Json(ProfileListResponse {
        count: total,
        next: window.next,
        previous: window.previous,
        results,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v2/users/{id}/",
    tag = "Users",
    operation_id = "getProfile",
    summary = "Get a user profile",
    params(("id" = String, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 403, description = "Not authenticated (NOT_AUTHENTICATED, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No such profile (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    require_profile_access(&auth_user, Action::Retrieve)?;

    let not_found = || AppError::NotFound("Not found.".into());
    let profile = user_profile::Entity::find_by_id(id.as_str())
        .one(&state.db)
        .await?
        .ok_or_else(not_found)?;
    let user = user::Entity::find_by_id(profile.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(ProfileResponse::new(profile, &user)))
}

#[utoipa::path(
    options,
    path = "/api/v2/users/",
    tag = "Users",
    operation_id = "profileListOptions",
    summary = "Describe the profile collection",
    responses(
        (status = 200, description = "Allowed methods in the `Allow` header", body = MetadataResponse),
        (status = 403, description = "Not authenticated (NOT_AUTHENTICATED, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn profile_list_options(auth_user: AuthUser) -> Result<impl IntoResponse, AppError> {
    require_profile_access(&auth_user, Action::Metadata)?;
    Ok(metadata("User Profile List"))
}

#[utoipa::path(
    options,
    path = "/api/v2/users/{id}/",
    tag = "Users",
    operation_id = "profileDetailOptions",
    summary = "Describe a profile",
    params(("id" = String, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Allowed methods in the `Allow` header", body = MetadataResponse),
        (status = 403, description = "Not authenticated (NOT_AUTHENTICATED, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
pub async fn profile_detail_options(auth_user: AuthUser) -> Result<impl IntoResponse, AppError> {
    require_profile_access(&auth_user, Action::Metadata)?;
    Ok(metadata("User Profile Instance"))
}

fn metadata(name: &'static str) -> impl IntoResponse {
    (
        [(header::ALLOW, ALLOW)],
        Json(MetadataResponse::new(name, "Read-only access to user profiles.")),
    )
}
