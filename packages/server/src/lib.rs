pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod service;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use tower::ServiceExt;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::routes::paths;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RehaGoal Server API",
        version = "2.0.0",
        description = "Profiles and workflow storage for RehaGoal clients"
    ),
    tags(
        (name = "Auth", description = "Token issuance, refresh and verification"),
        (name = "Root", description = "API entry point"),
        (name = "Users", description = "Read-only user profiles"),
        (name = "Workflows", description = "Workflow records and their content uploads"),
        (name = "Files", description = "Private download of workflow content"),
    ),
    paths(handlers::files::download_file),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes::api_routes(&state.config))
        .split_for_parts();

    let app = router
        .route("/", get(handlers::root::index))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url(paths::SCHEMA, api.clone()))
        .merge(Scalar::with_url("/scalar", api));

    let with_cors = app.clone().layer(cors);
    app.layer(middleware::from_fn_with_state(with_cors, route_cross_origin))
}

/// Send cross-origin traffic through the CORS layer.
///
/// The layer answers every `OPTIONS` request itself, so a plain `OPTIONS`
/// (no `Access-Control-Request-Method`) skips it and reaches the handlers,
/// which enforce authentication.
async fn route_cross_origin(
    State(with_cors): State<axum::Router>,
    request: Request,
    next: Next,
) -> Response {
    if is_cross_origin(&request) {
        match with_cors.oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    } else {
        next.run(request).await
    }
}

fn is_cross_origin(request: &Request) -> bool {
    let headers = request.headers();
    headers.contains_key(header::ORIGIN)
        && (request.method() != Method::OPTIONS
            || headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD))
}

/// `*` in `allow_origins` allows any origin; unparsable entries are skipped.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = if config.allow_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allow_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age))
}
