use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Storage object name (`<unix-micros>.<ext>`), the only link to the bytes.
    #[sea_orm(unique)]
    pub name: String,

    pub grenade_id: i32,
    #[sea_orm(belongs_to, from = "grenade_id", to = "id")]
    pub grenade: HasOne<super::grenade::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
