use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::{RepoError, bounded};
use crate::entity::grenade;
use crate::models::filters::{FilterError, Filters};
use crate::models::grenade::GrenadeInput;

/// Version assigned to freshly inserted grenades.
pub const INITIAL_VERSION: i32 = 1;

/// Equality filters for listing. An empty string matches every value.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrenadeFilter<'q> {
    pub map: &'q str,
    pub side: &'q str,
    pub grenade_type: &'q str,
}

pub struct GrenadeRepository<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> GrenadeRepository<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<grenade::Model, RepoError> {
        bounded(grenade::Entity::find_by_id(id).one(self.conn))
            .await?
            .ok_or(RepoError::NotFound)
    }

    pub async fn insert(&self, input: &GrenadeInput) -> Result<grenade::Model, RepoError> {
        let model = grenade::ActiveModel {
            map: Set(input.map.clone()),
            title: Set(input.title.clone()),
            description: Set(input.description.clone()),
            grenade_type: Set(input.grenade_type.clone()),
            side: Set(input.side.clone()),
            version: Set(INITIAL_VERSION),
            ..Default::default()
        };
        bounded(model.insert(self.conn)).await
    }

    /// Overwrite the content fields of grenade `id` provided it is still at
    /// `version`. Returns the new version.
    pub async fn update(
        &self,
        id: i32,
        version: i32,
        input: &GrenadeInput,
    ) -> Result<i32, RepoError> {
        let next_version = version + 1;
        let result = bounded(
            grenade::Entity::update_many()
                .col_expr(grenade::Column::Map, Expr::value(input.map.clone()))
                .col_expr(grenade::Column::Title, Expr::value(input.title.clone()))
                .col_expr(
                    grenade::Column::Description,
                    Expr::value(input.description.clone()),
                )
                .col_expr(
                    grenade::Column::GrenadeType,
                    Expr::value(input.grenade_type.clone()),
                )
                .col_expr(grenade::Column::Side, Expr::value(input.side.clone()))
                .col_expr(grenade::Column::Version, Expr::value(next_version))
                .filter(grenade::Column::Id.eq(id))
                .filter(grenade::Column::Version.eq(version))
                .exec(self.conn),
        )
        .await?;

        if result.rows_affected == 0 {
            return Err(RepoError::EditConflict);
        }
        Ok(next_version)
    }

    pub async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let result = bounded(grenade::Entity::delete_by_id(id).exec(self.conn)).await?;
        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    /// Filtered listing ordered by the requested column, ties broken by ascending id.
    pub async fn list_filtered(
        &self,
        filter: GrenadeFilter<'_>,
        filters: &Filters,
    ) -> Result<Vec<grenade::Model>, RepoError> {
        let column = sort_column(filters)?;

        let mut query = grenade::Entity::find();
        if !filter.map.is_empty() {
            query = query.filter(grenade::Column::Map.eq(filter.map));
        }
        if !filter.side.is_empty() {
            query = query.filter(grenade::Column::Side.eq(filter.side));
        }
        if !filter.grenade_type.is_empty() {
            query = query.filter(grenade::Column::GrenadeType.eq(filter.grenade_type));
        }

        let query = query
            .order_by(column, filters.sort_direction())
            .order_by_asc(grenade::Column::Id);

        bounded(query.all(self.conn)).await
    }
}

fn sort_column(filters: &Filters) -> Result<grenade::Column, FilterError> {
    match filters.sort_column()? {
        "id" => Ok(grenade::Column::Id),
        "map" => Ok(grenade::Column::Map),
        "side" => Ok(grenade::Column::Side),
        "type" => Ok(grenade::Column::GrenadeType),
        other => Err(FilterError::UnsafeSort(other.to_string())),
    }
}
