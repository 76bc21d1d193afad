pub mod user;
pub mod user_profile;
pub mod workflow;
