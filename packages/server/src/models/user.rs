use serde::Serialize;

use crate::entity::{user, user_profile};

/// A user profile as returned by the API.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    /// Random 12-character identifier.
    #[schema(example = "Zx8Yw7Vu6Ts5")]
    pub id: String,
    #[schema(example = "testuser")]
    pub username: String,
}

impl ProfileResponse {
    pub fn new(profile: user_profile::Model, user: &user::Model) -> Self {
        Self {
            id: profile.id,
            username: user.username.clone(),
        }
    }
}

/// Paginated profile list.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProfileListResponse {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<ProfileResponse>,
}
