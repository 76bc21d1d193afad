use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An authenticated principal. Credentials are checked here; everything
/// domain-level hangs off the one-to-one [`super::user_profile`].
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    /// Argon2 PHC string.
    #[serde(skip_serializing)]
    pub password: String,
    pub is_staff: bool,

    #[sea_orm(has_one)]
    pub profile: HasOne<super::user_profile::Entity>,

    pub date_joined: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
