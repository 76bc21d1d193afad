pub mod auth;
pub mod base_url;
pub mod payload;
