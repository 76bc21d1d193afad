use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ObtainTokenRequest {
    #[schema(example = "testuser")]
    pub username: String,
    #[schema(example = "testpassword")]
    pub password: String,
}

/// Body of the refresh and verify endpoints.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

pub fn validate_obtain_token_request(req: &ObtainTokenRequest) -> Result<(), AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::FieldValidation {
            field: "username",
            message: "This field may not be blank.".into(),
        });
    }
    if req.password.is_empty() {
        return Err(AppError::FieldValidation {
            field: "password",
            message: "This field may not be blank.".into(),
        });
    }
    Ok(())
}
