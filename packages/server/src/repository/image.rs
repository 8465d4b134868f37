use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::{RepoError, bounded};
use crate::entity::image;

pub struct ImageRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ImageRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<image::Model, RepoError> {
        bounded(image::Entity::find_by_id(id).one(self.conn))
            .await?
            .ok_or(RepoError::NotFound)
    }

    /// Record an already stored object against `grenade_id`.
    pub async fn insert(&self, name: &str, grenade_id: i32) -> Result<image::Model, RepoError> {
        let model = image::ActiveModel {
            name: Set(name.to_string()),
            grenade_id: Set(grenade_id),
            ..Default::default()
        };
        bounded(model.insert(self.conn)).await
    }

    pub async fn by_grenade(&self, grenade_id: i32) -> Result<Vec<image::Model>, RepoError> {
        bounded(
            image::Entity::find()
                .filter(image::Column::GrenadeId.eq(grenade_id))
                .order_by_asc(image::Column::Id)
                .all(self.conn),
        )
        .await
    }

    pub async fn all(&self) -> Result<Vec<image::Model>, RepoError> {
        bounded(
            image::Entity::find()
                .order_by_asc(image::Column::Id)
                .all(self.conn),
        )
        .await
    }

    pub async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let result = bounded(image::Entity::delete_by_id(id).exec(self.conn)).await?;
        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    /// Remove every image row of a grenade. Returns the number of rows removed.
    pub async fn delete_by_grenade(&self, grenade_id: i32) -> Result<u64, RepoError> {
        let result = bounded(
            image::Entity::delete_many()
                .filter(image::Column::GrenadeId.eq(grenade_id))
                .exec(self.conn),
        )
        .await?;
        Ok(result.rows_affected)
    }
}
