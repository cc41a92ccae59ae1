use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Sale status of a motorcycle in the catalog
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MotorcycleStatus {
    #[default]
    #[sea_orm(string_value = "disponivel")]
    Disponivel,
    #[sea_orm(string_value = "reservada")]
    Reservada,
    #[sea_orm(string_value = "vendida")]
    Vendida,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "motorcycles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub brand: String,
    pub model: String,
    pub year: i32,
    #[sea_orm(nullable)]
    pub color: Option<String>,
    #[sea_orm(nullable)]
    pub mileage: Option<i32>,
    #[sea_orm(nullable)]
    pub displacement: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(nullable)]
    pub condition: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub payment_methods: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub features: Option<String>,
    pub is_featured: bool,
    pub is_financed: bool,
    pub is_overdue: bool,
    pub is_worth_financing: bool,
    #[sea_orm(nullable)]
    pub finance_days_remaining: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub finance_monthly_payment: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub finance_total_remaining: Option<Decimal>,
    #[sea_orm(column_type = "Text", nullable)]
    pub thumbnail_url: Option<String>,
    pub status: MotorcycleStatus,
    #[sea_orm(nullable)]
    pub sold_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::motorcycle_image::Entity")]
    Images,
    #[sea_orm(has_many = "super::financial_record::Entity")]
    FinancialRecords,
}

impl Related<super::motorcycle_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::financial_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FinancialRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
