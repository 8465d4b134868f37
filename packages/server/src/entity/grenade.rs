use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "grenades")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub map: String,
    pub title: String,
    pub description: String,
    /// One of smoke, molotov, he, flash, decoy.
    #[sea_orm(column_name = "type")]
    pub grenade_type: String,
    /// CT or T.
    pub side: String,
    /// Bumped on every successful update; used for optimistic concurrency.
    pub version: i32,

    #[sea_orm(has_many)]
    pub images: HasMany<super::image::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
