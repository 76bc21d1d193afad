pub mod auth;
pub mod root;
pub mod shared;
pub mod user;
pub mod workflow;
