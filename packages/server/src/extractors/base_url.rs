use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::state::AppState;

/// Scheme and authority used to build absolute links in responses,
/// e.g. `http://localhost:8000`. Never ends with a slash.
///
/// `server.public_url` wins when configured; otherwise the request's `Host`
/// header and `X-Forwarded-Proto` are used.
#[derive(Debug, Clone)]
pub struct BaseUrl(pub String);

impl BaseUrl {
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl FromRequestParts<AppState> for BaseUrl {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(public) = &state.config.server.public_url {
            return Ok(BaseUrl(public.trim_end_matches('/').to_string()));
        }

        let scheme = parts
            .headers
            .get("X-Forwarded-Proto")
            .and_then(|v| v.to_str().ok())
            .filter(|p| matches!(*p, "http" | "https"))
            .unwrap_or("http");

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        Ok(BaseUrl(format!("{scheme}://{host}")))
    }
}
