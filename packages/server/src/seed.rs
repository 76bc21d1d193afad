use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::info;

use crate::config::BootstrapAdmin;
use crate::entity::user;
use crate::error::AppError;
use crate::service::identity::IdentityService;

/// Make sure the configured staff account exists.
///
/// An existing account of that name is left untouched, password included.
pub async fn ensure_bootstrap_admin(
    db: &DatabaseConnection,
    admin: &BootstrapAdmin,
) -> Result<(), AppError> {
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(admin.username.trim()))
        .one(db)
        .await?;
    if let Some(existing) = existing {
        IdentityService::new(db).resolve_profile(existing.id).await?;
        return Ok(());
    }

    match IdentityService::new(db)
        .create_principal(&admin.username, &admin.password, true)
        .await
    {
        Ok((user, _)) => {
            info!(username = %user.username, "Seeded bootstrap admin");
            Ok(())
        }
        // Another instance seeded it concurrently.
        Err(AppError::UsernameTaken) => Ok(()),
        Err(e) => Err(e),
    }
}
