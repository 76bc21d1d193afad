use serde::Serialize;

/// Links to the collections of the API.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ApiRootResponse {
    #[schema(example = "http://localhost:8000/api/v2/users/")]
    pub users: String,
    #[schema(example = "http://localhost:8000/api/v2/workflows/")]
    pub workflows: String,
}

/// Body of an `OPTIONS` response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MetadataResponse {
    pub name: &'static str,
    pub description: &'static str,
    pub renders: Vec<&'static str>,
    pub parses: Vec<&'static str>,
}

impl MetadataResponse {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            renders: vec!["application/json"],
            parses: vec![
                "application/json",
                "application/x-www-form-urlencoded",
                "multipart/form-data",
            ],
        }
    }
}
