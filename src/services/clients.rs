use crate::{
    common::{contains_ci, non_blank, nullable},
    db::DbPool,
    entities::{
        client::{self, DEFAULT_RELIABILITY_SCORE},
        financial_record::{self, RecordType},
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use super::validation::not_blank;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClientInput {
    #[validate(custom = "not_blank")]
    pub name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Email inválido"))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    #[validate(range(min = 0, max = 10, message = "A confiabilidade deve estar entre 0 e 10"))]
    pub reliability_score: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateClientInput {
    #[validate(custom = "not_blank")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub document: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(email(message = "Email inválido"))]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[validate(range(min = 0, max = 10, message = "A confiabilidade deve estar entre 0 e 10"))]
    pub reliability_score: Option<i32>,
}

impl UpdateClientInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.document.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.address.is_none()
            && self.notes.is_none()
            && self.reliability_score.is_none()
    }
}

/// A client with the figures derived from its ledger entries
#[derive(Debug, Clone, PartialEq)]
pub struct ClientWithTotals {
    pub client: client::Model,
    /// Distinct motorcycles referenced by the client's records
    pub total_motorcycles: u64,
    /// Sum of the client's `entrada` amounts
    pub total_sales: Decimal,
}

/// Service for the client register
#[derive(Clone)]
pub struct ClientService {
    db_pool: Arc<DbPool>,
}

impl ClientService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Clients ordered by name, optionally filtered by name, document or email
    #[instrument(skip(self))]
    pub async fn list_clients(
        &self,
        search: Option<String>,
    ) -> Result<Vec<ClientWithTotals>, ServiceError> {
        let mut query = client::Entity::find();
        if let Some(term) = non_blank(search) {
            query = query.filter(
                Condition::any()
                    .add(contains_ci(client::Column::Name, &term))
                    .add(contains_ci(client::Column::Document, &term))
                    .add(contains_ci(client::Column::Email, &term)),
            );
        }

        let clients = query
            .order_by_asc(client::Column::Name)
            .order_by_asc(client::Column::Id)
            .all(&*self.db_pool)
            .await?;

        self.with_totals(clients).await
    }

    #[instrument(skip(self))]
    pub async fn get_client(&self, id: i32) -> Result<ClientWithTotals, ServiceError> {
        let client = self.find(id).await?;
        let mut rows = self.with_totals(vec![client]).await?;
        rows.pop()
            .ok_or_else(|| ServiceError::not_found("Cliente não encontrado"))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_client(
        &self,
        mut input: CreateClientInput,
    ) -> Result<ClientWithTotals, ServiceError> {
        input.email = non_blank(input.email);
        input.validate()?;

        let now = Utc::now();
        let created = client::ActiveModel {
            name: Set(input.name.trim().to_string()),
            document: Set(non_blank(input.document)),
            phone: Set(non_blank(input.phone)),
            email: Set(input.email),
            address: Set(non_blank(input.address)),
            notes: Set(non_blank(input.notes)),
            reliability_score: Set(input
                .reliability_score
                .unwrap_or(DEFAULT_RELIABILITY_SCORE)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        info!(client_id = created.id, "client created");
        Ok(ClientWithTotals {
            client: created,
            total_motorcycles: 0,
            total_sales: Decimal::ZERO,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn update_client(
        &self,
        id: i32,
        mut input: UpdateClientInput,
    ) -> Result<ClientWithTotals, ServiceError> {
        if input.is_empty() {
            return Err(ServiceError::bad_request("Nenhum campo para atualizar"));
        }
        input.email = input.email.map(non_blank);
        input.validate()?;

        let mut model: client::ActiveModel = self.find(id).await?.into();
        if let Some(name) = input.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(document) = input.document {
            model.document = Set(non_blank(document));
        }
        if let Some(phone) = input.phone {
            model.phone = Set(non_blank(phone));
        }
        if let Some(email) = input.email {
            model.email = Set(email);
        }
        if let Some(address) = input.address {
            model.address = Set(non_blank(address));
        }
        if let Some(notes) = input.notes {
            model.notes = Set(non_blank(notes));
        }
        if let Some(score) = input.reliability_score {
            model.reliability_score = Set(score);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db_pool).await?;
        info!(client_id = id, "client updated");

        let mut rows = self.with_totals(vec![updated]).await?;
        rows.pop()
            .ok_or_else(|| ServiceError::not_found("Cliente não encontrado"))
    }

    /// Deletes the client; linked ledger entries keep their data with no client
    #[instrument(skip(self))]
    pub async fn delete_client(&self, id: i32) -> Result<(), ServiceError> {
        let result = client::Entity::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Cliente não encontrado"));
        }
        info!(client_id = id, "client deleted");
        Ok(())
    }

    async fn find(&self, id: i32) -> Result<client::Model, ServiceError> {
        client::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cliente não encontrado"))
    }

    async fn with_totals(
        &self,
        clients: Vec<client::Model>,
    ) -> Result<Vec<ClientWithTotals>, ServiceError> {
        if clients.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = clients.iter().map(|c| c.id).collect();
        let rows: Vec<(Option<i32>, Option<i32>, RecordType, Decimal)> =
            financial_record::Entity::find()
                .select_only()
                .column(financial_record::Column::ClientId)
                .column(financial_record::Column::MotorcycleId)
                .column(financial_record::Column::RecordType)
                .column(financial_record::Column::Amount)
                .filter(financial_record::Column::ClientId.is_in(ids))
                .into_tuple()
                .all(&*self.db_pool)
                .await?;

        let mut motorcycles: HashMap<i32, HashSet<i32>> = HashMap::new();
        let mut sales: HashMap<i32, Decimal> = HashMap::new();
        for (client_id, motorcycle_id, record_type, amount) in rows {
            let Some(client_id) = client_id else { continue };
            if let Some(motorcycle_id) = motorcycle_id {
                motorcycles.entry(client_id).or_default().insert(motorcycle_id);
            }
            if record_type == RecordType::Entrada {
                *sales.entry(client_id).or_default() += amount;
            }
        }

        Ok(clients
            .into_iter()
            .map(|client| ClientWithTotals {
                total_motorcycles: motorcycles.get(&client.id).map_or(0, |s| s.len() as u64),
                total_sales: sales.get(&client.id).copied().unwrap_or_default(),
                client,
            })
            .collect())
    }
}
