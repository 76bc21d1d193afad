//! Canonical URL paths, used both for routing and for building links.

pub const API_ROOT: &str = "/api/v2/";
pub const USERS: &str = "/api/v2/users/";
pub const WORKFLOWS: &str = "/api/v2/workflows/";
pub const FILES: &str = "/api/v2/files/";
pub const SCHEMA: &str = "/api/v2/schema/";

pub fn user(profile_id: &str) -> String {
    format!("{USERS}{profile_id}/")
}

pub fn workflow(workflow_id: &str) -> String {
    format!("{WORKFLOWS}{workflow_id}/")
}

pub fn file(blob_id: &str) -> String {
    format!("{FILES}{blob_id}")
}
