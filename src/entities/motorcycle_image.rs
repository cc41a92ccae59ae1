use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "motorcycle_images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub motorcycle_id: i32,
    #[sea_orm(column_type = "Text")]
    pub image_url: String,
    /// Key of the object in the image store
    #[sea_orm(column_type = "Text")]
    pub storage_key: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::motorcycle::Entity",
        from = "Column::MotorcycleId",
        to = "super::motorcycle::Column::Id",
        on_delete = "Cascade"
    )]
    Motorcycle,
}

impl Related<super::motorcycle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Motorcycle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
