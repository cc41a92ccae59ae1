use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Direction of a ledger entry
#[derive(
    Clone,
    Copy,
    Debug,
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
pub enum RecordType {
    /// Money coming in
    #[sea_orm(string_value = "entrada")]
    Entrada,
    /// Money going out
    #[sea_orm(string_value = "saida")]
    Saida,
}

pub const ENTRADA_CATEGORIES: [&str; 4] = ["Venda", "Comissão", "Entrada de Caixa", "Outros"];

pub const SAIDA_CATEGORIES: [&str; 7] = [
    "Aquisição",
    "Manutenção",
    "Publicidade",
    "Combustível",
    "Documentação",
    "Despesas Fixas",
    "Outros",
];

/// Category that marks the sale of a motorcycle.
pub const SALE_CATEGORY: &str = "Venda";

impl RecordType {
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            RecordType::Entrada => &ENTRADA_CATEGORIES,
            RecordType::Saida => &SAIDA_CATEGORIES,
        }
    }

    pub fn allows_category(&self, category: &str) -> bool {
        self.categories().contains(&category)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_name = "type")]
    pub record_type: RecordType,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub category: String,
    pub date: NaiveDate,
    #[sea_orm(nullable)]
    pub motorcycle_id: Option<i32>,
    #[sea_orm(nullable)]
    pub client_id: Option<i32>,
    #[sea_orm(nullable)]
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::motorcycle::Entity",
        from = "Column::MotorcycleId",
        to = "super::motorcycle::Column::Id",
        on_delete = "SetNull"
    )]
    Motorcycle,
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id",
        on_delete = "SetNull"
    )]
    Client,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    CreatedBy,
}

impl Related<super::motorcycle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Motorcycle.def()
    }
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreatedBy.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_scoped_by_type() {
        assert!(RecordType::Entrada.allows_category("Venda"));
        assert!(!RecordType::Saida.allows_category("Venda"));
        assert!(RecordType::Saida.allows_category("Manutenção"));
        assert!(RecordType::Entrada.allows_category("Outros"));
        assert!(RecordType::Saida.allows_category("Outros"));
    }

    #[test]
    fn record_type_round_trips_through_strings() {
        assert_eq!(RecordType::Saida.to_string(), "saida");
        assert_eq!("entrada".parse::<RecordType>().unwrap(), RecordType::Entrada);
    }
}
