pub mod identity;
pub mod workflow;

use sea_orm::{DbErr, SqlErr};

use crate::error::AppError;

/// Fresh random ids tried before an insert gives up.
pub const MAX_ID_ATTEMPTS: usize = 3;

/// A unique-constraint hit on a random primary key is a creation failure the
/// caller may retry; anything else is internal.
fn map_id_collision(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::warn!("Random identifier collided on insert");
            AppError::Conflict("Identifier collision, please retry".into())
        }
        _ => AppError::from(err),
    }
}
