pub mod id;
pub mod storage;

pub use id::{ID_LENGTH, is_valid_id, random_id};
