pub mod auth;
pub mod files;
pub mod root;
pub mod user;
pub mod workflow;
