use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workflow")]
pub struct Model {
    /// Random 12-character `[A-Za-z0-9]` identifier.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub owner_id: String,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user_profile::Entity>,

    /// Blob id of the current content, allocated independently of `id`.
    pub content: String,
}

impl ActiveModelBehavior for ActiveModel {}
