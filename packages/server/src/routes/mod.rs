pub mod paths;

use axum::routing::{any, get};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

/// All API routes. Paths are absolute and keep their trailing slashes, which
/// existing clients depend on.
pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(auth_routes())
        .merge(v2_routes(config))
        .merge(retired_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::obtain_token))
        .routes(routes!(handlers::auth::refresh_token))
        .routes(routes!(handlers::auth::verify_token))
}

fn v2_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::root::api_root))
        .routes(routes!(
            handlers::user::list_profiles,
            handlers::user::profile_list_options
        ))
        .routes(routes!(
            handlers::user::get_profile,
            handlers::user::profile_detail_options
        ))
        .merge(workflow_routes(config))
        .merge(file_routes())
}

fn workflow_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::workflow::list_workflows,
            handlers::workflow::create_workflow,
            handlers::workflow::workflow_list_options
        ))
        .routes(routes!(
            handlers::workflow::get_workflow,
            handlers::workflow::replace_workflow,
            handlers::workflow::patch_workflow,
            handlers::workflow::delete_workflow,
            handlers::workflow::workflow_detail_options
        ))
        .layer(handlers::workflow::upload_body_limit(
            config.storage.max_content_size,
        ))
}

/// Downloads match every path below `files/`, so ids with extra segments or a
/// trailing slash still pass the authentication check before being refused.
/// The documented `{id}` form is registered on `ApiDoc` instead.
fn file_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .route(
            &format!("{}{{*id}}", paths::FILES),
            get(handlers::files::download_file),
        )
        .routes(routes!(handlers::files::download_without_id))
}

/// The first API generation is gone for good; every method and path under it
/// answers 410.
fn retired_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .route("/api/v1", any(handlers::root::gone))
        .route("/api/v1/", any(handlers::root::gone))
        .route("/api/v1/{*rest}", any(handlers::root::gone))
}
