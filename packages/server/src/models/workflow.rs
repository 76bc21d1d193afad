use serde::Serialize;

use crate::entity::workflow;
use crate::extractors::base_url::BaseUrl;
use crate::routes::paths;

/// A workflow as returned by the API.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WorkflowResponse {
    /// Random 12-character identifier.
    #[schema(example = "aB3dE5gH7jK9")]
    pub id: String,
    /// Absolute link to the owning profile.
    #[schema(example = "http://localhost:8000/api/v2/users/Zx8Yw7Vu6Ts5/")]
    pub owner: String,
    /// Absolute link to the content download.
    #[schema(example = "http://localhost:8000/api/v2/files/Qw3Er4Ty5Ui6")]
    pub content: String,
}

impl WorkflowResponse {
    pub fn new(model: workflow::Model, base: &BaseUrl) -> Self {
        Self {
            owner: base.join(&paths::user(&model.owner_id)),
            content: base.join(&paths::file(&model.content)),
            id: model.id,
        }
    }
}

/// Paginated workflow list.
#[derive(Serialize, utoipa::ToSchema)]
pub struct WorkflowListResponse {
    /// Total number of workflows visible to the caller.
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<WorkflowResponse>,
}

/// Multipart form accepted by create and update. Only `content` is read;
/// `id` and `owner` are ignored if sent.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct WorkflowUpload {
    #[schema(format = Binary)]
    pub content: String,
}
