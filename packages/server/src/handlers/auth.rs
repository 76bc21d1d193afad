use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::payload::Payload;
use crate::models::auth::{
    ObtainTokenRequest, TokenRequest, TokenResponse, validate_obtain_token_request,
};
use crate::service::identity::IdentityService;
use crate::state::AppState;
use crate::utils::jwt;

#[utoipa::path(
    post,
    path = "/api-token-auth/",
    tag = "Auth",
    operation_id = "obtainToken",
    summary = "Obtain a token",
    description = "Exchanges a username and password for a signed token. Accepts JSON or a urlencoded form.",
    request_body = ObtainTokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing fields or wrong credentials (VALIDATION_ERROR, INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn obtain_token(
    State(state): State<AppState>,
    Payload(payload): Payload<ObtainTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    validate_obtain_token_request(&payload)?;

    let user = IdentityService::new(&state.db)
        .authenticate(&payload.username, &payload.password)
        .await?;

    let auth = &state.config.auth;
    let token = jwt::sign(user.id, &user.username, &auth.jwt_secret, auth.token_ttl_secs, None)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {e}")))?;

    Ok(Json(TokenResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api-token-refresh/",
    tag = "Auth",
    operation_id = "refreshToken",
    summary = "Refresh a token",
    description = "Issues a successor for a still-valid token, as long as the original login is within the refresh window.",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token refreshed", body = TokenResponse),
        (status = 400, description = "Token invalid, expired or past the refresh window (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Payload(payload): Payload<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let auth = &state.config.auth;
    let token = jwt::refresh(
        &payload.token,
        &auth.jwt_secret,
        auth.token_ttl_secs,
        auth.refresh_window_secs,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "Token refresh rejected");
        AppError::Validation("Signature has expired or is invalid.".into())
    })?;

    Ok(Json(TokenResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api-token-verify/",
    tag = "Auth",
    operation_id = "verifyToken",
    summary = "Verify a token",
    description = "Echoes the token back if its signature and expiry are valid.",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token valid", body = TokenResponse),
        (status = 400, description = "Token invalid or expired (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip_all)]
pub async fn verify_token(
    State(state): State<AppState>,
    Payload(payload): Payload<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    jwt::verify(&payload.token, &state.config.auth.jwt_secret)
        .map_err(|_| AppError::Validation("Signature has expired or is invalid.".into()))?;

    Ok(Json(TokenResponse {
        token: payload.token,
    }))
}
