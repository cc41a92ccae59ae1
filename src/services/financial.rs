use crate::{
    common::{contains_ci, month_start, next_month_start, non_blank, nullable, parse_date},
    db::DbPool,
    entities::{
        client,
        financial_record::{self, RecordType, SALE_CATEGORY},
        motorcycle, user,
    },
    errors::ServiceError,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr,
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::{amount_positive, not_blank};

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FinancialFilters {
    #[serde(rename = "type")]
    #[param(value_type = Option<RecordType>)]
    pub record_type: Option<RecordType>,
    pub category: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    /// Inclusive, `YYYY-MM-DD`
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub motorcycle_id: Option<i32>,
    pub client_id: Option<i32>,
    /// Substring of the description
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFinancialRecordInput {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[validate(custom = "not_blank")]
    pub description: String,
    #[validate(custom = "amount_positive")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    #[validate(custom = "not_blank")]
    pub category: String,
    /// Defaults to today
    pub date: Option<NaiveDate>,
    pub motorcycle_id: Option<i32>,
    pub client_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFinancialRecordInput {
    #[serde(rename = "type")]
    pub record_type: Option<RecordType>,
    #[validate(custom = "not_blank")]
    pub description: Option<String>,
    #[validate(custom = "amount_positive")]
    #[schema(value_type = Option<f64>)]
    pub amount: Option<Decimal>,
    #[validate(custom = "not_blank")]
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i32>)]
    pub motorcycle_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i32>)]
    pub client_id: Option<Option<i32>>,
}

impl UpdateFinancialRecordInput {
    pub fn is_empty(&self) -> bool {
        self.record_type.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.motorcycle_id.is_none()
            && self.client_id.is_none()
    }
}

/// A ledger entry with the names of what it links to
#[derive(Debug, Clone)]
pub struct FinancialRecordView {
    pub record: financial_record::Model,
    /// `(brand, model)` of the linked motorcycle
    pub motorcycle: Option<(String, String)>,
    pub client_name: Option<String>,
}

/// Entradas and saidas over some period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    pub entradas: Decimal,
    pub saidas: Decimal,
}

impl LedgerTotals {
    pub fn add(&mut self, record_type: RecordType, amount: Decimal) {
        match record_type {
            RecordType::Entrada => self.entradas += amount,
            RecordType::Saida => self.saidas += amount,
        }
    }

    pub fn saldo(&self) -> Decimal {
        self.entradas - self.saidas
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinancialSummary {
    pub totals: LedgerTotals,
    pub transactions_today: u64,
    pub month: LedgerTotals,
    pub categories: BTreeMap<String, Decimal>,
}

fn is_sale(record_type: RecordType, category: &str, motorcycle_id: Option<i32>) -> bool {
    record_type == RecordType::Entrada && category == SALE_CATEGORY && motorcycle_id.is_some()
}

fn check_category(record_type: RecordType, category: &str) -> Result<(), ServiceError> {
    if record_type.allows_category(category) {
        Ok(())
    } else {
        Err(ServiceError::bad_request(format!(
            "Categoria inválida para o tipo {}",
            record_type
        )))
    }
}

/// Totals per type, optionally restricted to `[from, until)`
pub(crate) async fn ledger_totals<C: ConnectionTrait>(
    conn: &C,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Result<LedgerTotals, ServiceError> {
    use financial_record::Column;

    let mut query = financial_record::Entity::find()
        .select_only()
        .column(Column::RecordType)
        .column_as(Expr::col(Column::Amount).sum(), "total")
        .group_by(Column::RecordType);
    if let Some((from, until)) = range {
        query = query.filter(Column::Date.gte(from)).filter(Column::Date.lt(until));
    }

    let rows: Vec<(RecordType, Option<Decimal>)> = query.into_tuple().all(conn).await?;
    let mut totals = LedgerTotals::default();
    for (record_type, total) in rows {
        totals.add(record_type, total.unwrap_or_default().round_dp(2));
    }
    Ok(totals)
}

/// Service for the financial ledger
#[derive(Clone)]
pub struct FinancialService {
    db_pool: Arc<DbPool>,
}

impl FinancialService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Ledger entries, newest date first
    #[instrument(skip(self))]
    pub async fn list_records(
        &self,
        filters: FinancialFilters,
    ) -> Result<Vec<FinancialRecordView>, ServiceError> {
        use financial_record::Column;

        let mut query = financial_record::Entity::find();
        if let Some(record_type) = filters.record_type {
            query = query.filter(Column::RecordType.eq(record_type));
        }
        if let Some(category) = non_blank(filters.category) {
            query = query.filter(Column::Category.eq(category));
        }
        if let Some(start) = non_blank(filters.start_date) {
            query = query.filter(Column::Date.gte(parse_date(&start)?));
        }
        if let Some(end) = non_blank(filters.end_date) {
            query = query.filter(Column::Date.lte(parse_date(&end)?));
        }
        if let Some(motorcycle_id) = filters.motorcycle_id {
            query = query.filter(Column::MotorcycleId.eq(motorcycle_id));
        }
        if let Some(client_id) = filters.client_id {
            query = query.filter(Column::ClientId.eq(client_id));
        }
        if let Some(term) = non_blank(filters.search) {
            query = query.filter(contains_ci(Column::Description, &term));
        }

        let records = query
            .order_by_desc(Column::Date)
            .order_by_desc(Column::Id)
            .all(&*self.db_pool)
            .await?;

        self.with_links(records).await
    }

    #[instrument(skip(self))]
    pub async fn get_record(&self, id: i32) -> Result<FinancialRecordView, ServiceError> {
        let record = self.find(id).await?;
        let mut views = self.with_links(vec![record]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::not_found("Registro não encontrado"))
    }

    /// Records an entry. A sale linked to a motorcycle also marks it sold.
    #[instrument(skip(self, input), fields(record_type = %input.record_type, category = %input.category))]
    pub async fn create_record(
        &self,
        input: CreateFinancialRecordInput,
        created_by: Option<i32>,
    ) -> Result<FinancialRecordView, ServiceError> {
        input.validate()?;
        let category = input.category.trim().to_string();
        check_category(input.record_type, &category)?;

        let txn = self.db_pool.begin().await?;
        ensure_links(&txn, input.motorcycle_id, input.client_id).await?;
        ensure_author(&txn, created_by).await?;

        let now = Utc::now();
        let record = financial_record::ActiveModel {
            record_type: Set(input.record_type),
            description: Set(input.description.trim().to_string()),
            amount: Set(input.amount),
            category: Set(category),
            date: Set(input.date.unwrap_or_else(|| now.date_naive())),
            motorcycle_id: Set(input.motorcycle_id),
            client_id: Set(input.client_id),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let (true, Some(motorcycle_id)) = (
            is_sale(record.record_type, &record.category, record.motorcycle_id),
            record.motorcycle_id,
        ) {
            super::motorcycles::mark_sold(&txn, motorcycle_id).await?;
        }
        txn.commit().await?;

        info!(record_id = record.id, amount = %record.amount, "financial record created");
        self.get_record(record.id).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_record(
        &self,
        id: i32,
        input: UpdateFinancialRecordInput,
    ) -> Result<FinancialRecordView, ServiceError> {
        if input.is_empty() {
            return Err(ServiceError::bad_request("Nenhum campo para atualizar"));
        }
        input.validate()?;

        let txn = self.db_pool.begin().await?;
        let Some(existing) = financial_record::Entity::find_by_id(id).one(&txn).await? else {
            return Err(ServiceError::not_found("Registro não encontrado"));
        };

        let record_type = input.record_type.unwrap_or(existing.record_type);
        let category = input
            .category
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| existing.category.clone());
        check_category(record_type, &category)?;

        let motorcycle_id = input.motorcycle_id.unwrap_or(existing.motorcycle_id);
        let client_id = input.client_id.unwrap_or(existing.client_id);
        ensure_links(
            &txn,
            motorcycle_id.filter(|m| Some(*m) != existing.motorcycle_id),
            client_id.filter(|c| Some(*c) != existing.client_id),
        )
        .await?;

        let mut model: financial_record::ActiveModel = existing.into();
        model.record_type = Set(record_type);
        model.category = Set(category.clone());
        model.motorcycle_id = Set(motorcycle_id);
        model.client_id = Set(client_id);
        if let Some(description) = input.description {
            model.description = Set(description.trim().to_string());
        }
        if let Some(amount) = input.amount {
            model.amount = Set(amount);
        }
        if let Some(date) = input.date {
            model.date = Set(date);
        }
        model.updated_at = Set(Utc::now());
        model.update(&txn).await?;

        if let (true, Some(motorcycle_id)) =
            (is_sale(record_type, &category, motorcycle_id), motorcycle_id)
        {
            super::motorcycles::mark_sold(&txn, motorcycle_id).await?;
        }
        txn.commit().await?;

        info!(record_id = id, "financial record updated");
        self.get_record(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_record(&self, id: i32) -> Result<(), ServiceError> {
        let result = financial_record::Entity::delete_by_id(id)
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Registro não encontrado"));
        }
        info!(record_id = id, "financial record deleted");
        Ok(())
    }

    /// Ledger overview relative to `today`
    #[instrument(skip(self))]
    pub async fn summary(&self, today: NaiveDate) -> Result<FinancialSummary, ServiceError> {
        use financial_record::Column;
        let db = &*self.db_pool;

        let totals = ledger_totals(db, None).await?;
        let month = ledger_totals(db, Some((month_start(today, 0), next_month_start(today)))).await?;

        let transactions_today = financial_record::Entity::find()
            .filter(Column::Date.eq(today))
            .count(db)
            .await?;

        let rows: Vec<(String, Option<Decimal>)> = financial_record::Entity::find()
            .select_only()
            .column(Column::Category)
            .column_as(Expr::col(Column::Amount).sum(), "total")
            .group_by(Column::Category)
            .into_tuple()
            .all(db)
            .await?;
        let categories = rows
            .into_iter()
            .map(|(category, total)| (category, total.unwrap_or_default().round_dp(2)))
            .collect();

        Ok(FinancialSummary {
            totals,
            transactions_today,
            month,
            categories,
        })
    }

    async fn find(&self, id: i32) -> Result<financial_record::Model, ServiceError> {
        financial_record::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Registro não encontrado"))
    }

    async fn with_links(
        &self,
        records: Vec<financial_record::Model>,
    ) -> Result<Vec<FinancialRecordView>, ServiceError> {
        let db = &*self.db_pool;

        let mut motorcycle_ids: Vec<i32> = records.iter().filter_map(|r| r.motorcycle_id).collect();
        motorcycle_ids.sort_unstable();
        motorcycle_ids.dedup();
        let mut client_ids: Vec<i32> = records.iter().filter_map(|r| r.client_id).collect();
        client_ids.sort_unstable();
        client_ids.dedup();

        let motorcycles: HashMap<i32, (String, String)> = if motorcycle_ids.is_empty() {
            HashMap::new()
        } else {
            motorcycle::Entity::find()
                .filter(motorcycle::Column::Id.is_in(motorcycle_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|m| (m.id, (m.brand, m.model)))
                .collect()
        };

        let clients: HashMap<i32, String> = if client_ids.is_empty() {
            HashMap::new()
        } else {
            client::Entity::find()
                .filter(client::Column::Id.is_in(client_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect()
        };

        Ok(records
            .into_iter()
            .map(|record| FinancialRecordView {
                motorcycle: record.motorcycle_id.and_then(|id| motorcycles.get(&id).cloned()),
                client_name: record.client_id.and_then(|id| clients.get(&id).cloned()),
                record,
            })
            .collect())
    }
}

/// Rejects references to motorcycles or clients that do not exist
async fn ensure_links<C: ConnectionTrait>(
    conn: &C,
    motorcycle_id: Option<i32>,
    client_id: Option<i32>,
) -> Result<(), ServiceError> {
    if let Some(id) = motorcycle_id {
        if motorcycle::Entity::find_by_id(id).one(conn).await?.is_none() {
            return Err(ServiceError::bad_request("Moto não encontrada"));
        }
    }
    if let Some(id) = client_id {
        if client::Entity::find_by_id(id).one(conn).await?.is_none() {
            return Err(ServiceError::bad_request("Cliente não encontrado"));
        }
    }
    Ok(())
}

/// The author must still have an account when the entry is written
async fn ensure_author<C: ConnectionTrait>(
    conn: &C,
    created_by: Option<i32>,
) -> Result<(), ServiceError> {
    if let Some(id) = created_by {
        if user::Entity::find_by_id(id).one(conn).await?.is_none() {
            return Err(ServiceError::Unauthorized("Não autorizado".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::motorcycle::MotorcycleStatus;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    async fn service() -> (FinancialService, Arc<DbPool>) {
        let pool = Arc::new(crate::db::test_pool().await);
        (FinancialService::new(pool.clone()), pool)
    }

    async fn bike(pool: &DbPool) -> motorcycle::Model {
        let now = Utc::now();
        motorcycle::ActiveModel {
            brand: Set("Yamaha".into()),
            model: Set("MT-03".into()),
            year: Set(2022),
            price: Set(dec!(28000)),
            is_featured: Set(false),
            is_financed: Set(false),
            is_overdue: Set(false),
            is_worth_financing: Set(false),
            status: Set(MotorcycleStatus::Disponivel),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(pool)
        .await
        .unwrap()
    }

    fn entry(
        record_type: RecordType,
        category: &str,
        amount: Decimal,
        date: NaiveDate,
    ) -> CreateFinancialRecordInput {
        CreateFinancialRecordInput {
            record_type,
            description: format!("{} {}", category, amount),
            amount,
            category: category.into(),
            date: Some(date),
            motorcycle_id: None,
            client_id: None,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn sale_marks_motorcycle_sold() {
        let (svc, pool) = service().await;
        let bike = bike(&pool).await;

        let mut sale = entry(RecordType::Entrada, "Venda", dec!(28000), day(2025, 3, 9));
        sale.motorcycle_id = Some(bike.id);
        let view = svc.create_record(sale, None).await.unwrap();
        assert_eq!(view.motorcycle, Some(("Yamaha".into(), "MT-03".into())));

        let sold = motorcycle::Entity::find_by_id(bike.id)
            .one(&*pool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sold.status, MotorcycleStatus::Vendida);
        assert!(sold.sold_at.is_some());
    }

    #[tokio::test]
    async fn category_must_match_type() {
        let (svc, _) = service().await;
        let err = svc
            .create_record(entry(RecordType::Saida, "Venda", dec!(10), day(2025, 3, 9)), None)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::BadRequest(_));

        let ok = svc
            .create_record(entry(RecordType::Saida, "Manutenção", dec!(10), day(2025, 3, 9)), None)
            .await
            .unwrap();
        let err = svc
            .update_record(
                ok.record.id,
                UpdateFinancialRecordInput {
                    record_type: Some(RecordType::Entrada),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::BadRequest(_));
    }

    #[tokio::test]
    async fn unknown_links_are_rejected() {
        let (svc, _) = service().await;
        let mut input = entry(RecordType::Entrada, "Comissão", dec!(10), day(2025, 3, 9));
        input.client_id = Some(404);
        let err = svc.create_record(input, None).await.unwrap_err();
        assert_eq!(err.response_message(), "Cliente não encontrado");
    }

    #[tokio::test]
    async fn summary_arithmetic() {
        let (svc, _) = service().await;
        let today = day(2025, 3, 9);
        for input in [
            entry(RecordType::Entrada, "Venda", dec!(20000), today),
            entry(RecordType::Saida, "Manutenção", dec!(1500.50), today),
            entry(RecordType::Saida, "Aquisição", dec!(15000), day(2025, 2, 20)),
            entry(RecordType::Entrada, "Comissão", dec!(500), day(2025, 3, 1)),
        ] {
            svc.create_record(input, None).await.unwrap();
        }

        let summary = svc.summary(today).await.unwrap();
        assert_eq!(summary.totals.entradas, dec!(20500));
        assert_eq!(summary.totals.saidas, dec!(16500.50));
        assert_eq!(summary.totals.saldo(), dec!(3999.50));
        assert_eq!(summary.transactions_today, 2);
        assert_eq!(summary.month.entradas, dec!(20500));
        assert_eq!(summary.month.saidas, dec!(1500.50));
        assert_eq!(summary.categories.get("Aquisição"), Some(&dec!(15000)));
    }

    #[tokio::test]
    async fn list_filters_by_date_range_and_orders_newest_first() {
        let (svc, _) = service().await;
        for d in [day(2025, 1, 10), day(2025, 2, 10), day(2025, 3, 10)] {
            svc.create_record(entry(RecordType::Entrada, "Outros", dec!(1), d), None)
                .await
                .unwrap();
        }

        let rows = svc
            .list_records(FinancialFilters {
                start_date: Some("2025-02-01".into()),
                end_date: Some("2025-03-10".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let dates: Vec<_> = rows.iter().map(|r| r.record.date).collect();
        assert_eq!(dates, vec![day(2025, 3, 10), day(2025, 2, 10)]);

        let err = svc
            .list_records(FinancialFilters {
                start_date: Some("10/02/2025".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::BadRequest(_));
    }

    #[tokio::test]
    async fn entries_need_an_existing_author() {
        let (svc, _) = service().await;
        let err = svc
            .create_record(entry(RecordType::Entrada, "Outros", dec!(5), day(2025, 3, 9)), Some(404))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Unauthorized(_));
    }
}
