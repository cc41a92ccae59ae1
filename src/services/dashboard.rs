use crate::{
    common::{month_start, next_month_start},
    db::DbPool,
    entities::{
        client,
        financial_record::{self, RecordType},
        motorcycle::{self, MotorcycleStatus},
    },
    errors::ServiceError,
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect};
use std::sync::Arc;
use tracing::instrument;

use super::financial::{ledger_totals, LedgerTotals};

/// Months covered by the dashboard chart, current month included
pub const MONTHS_SHOWN: u32 = 6;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// `Mmm/YY` label with Portuguese month names
pub fn month_label(date: NaiveDate) -> String {
    format!(
        "{}/{:02}",
        MONTH_ABBREVIATIONS[date.month0() as usize],
        date.year().rem_euclid(100)
    )
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryCounts {
    pub total: u64,
    pub disponiveis: u64,
    pub vendidas: u64,
    pub reservadas: u64,
    pub financiadas: u64,
    pub atrasadas: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBucket {
    pub month: NaiveDate,
    /// Number of `entrada` records in the month
    pub vendas: u64,
    pub totals: LedgerTotals,
}

impl MonthlyBucket {
    pub fn label(&self) -> String {
        month_label(self.month)
    }

    pub fn lucro(&self) -> Decimal {
        self.totals.saldo()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub inventory: InventoryCounts,
    pub totals: LedgerTotals,
    pub clients: u64,
    /// Oldest month first; the last bucket is the current month
    pub monthly: Vec<MonthlyBucket>,
}

impl DashboardStats {
    pub fn current_month(&self) -> Option<&MonthlyBucket> {
        self.monthly.last()
    }
}

/// Builds empty buckets for the `MONTHS_SHOWN` months ending at `today`
fn empty_buckets(today: NaiveDate) -> Vec<MonthlyBucket> {
    (0..MONTHS_SHOWN)
        .rev()
        .map(|offset| MonthlyBucket {
            month: month_start(today, offset),
            vendas: 0,
            totals: LedgerTotals::default(),
        })
        .collect()
}

fn bucket_rows(
    today: NaiveDate,
    rows: impl IntoIterator<Item = (NaiveDate, RecordType, Decimal)>,
) -> Vec<MonthlyBucket> {
    let mut buckets = empty_buckets(today);
    for (date, record_type, amount) in rows {
        let month = month_start(date, 0);
        if let Some(bucket) = buckets.iter_mut().find(|b| b.month == month) {
            if record_type == RecordType::Entrada {
                bucket.vendas += 1;
            }
            bucket.totals.add(record_type, amount);
        }
    }
    for bucket in &mut buckets {
        bucket.totals.entradas = bucket.totals.entradas.round_dp(2);
        bucket.totals.saidas = bucket.totals.saidas.round_dp(2);
    }
    buckets
}

/// Read-only aggregates for the admin dashboard
#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn stats(&self, today: NaiveDate) -> Result<DashboardStats, ServiceError> {
        let db = &*self.db_pool;

        let by_status: Vec<(MotorcycleStatus, i64)> = motorcycle::Entity::find()
            .select_only()
            .column(motorcycle::Column::Status)
            .column_as(Expr::col(motorcycle::Column::Id).count(), "count")
            .group_by(motorcycle::Column::Status)
            .into_tuple()
            .all(db)
            .await?;

        let mut inventory = InventoryCounts::default();
        for (status, count) in by_status {
            let count = count.max(0) as u64;
            inventory.total += count;
            match status {
                MotorcycleStatus::Disponivel => inventory.disponiveis = count,
                MotorcycleStatus::Vendida => inventory.vendidas = count,
                MotorcycleStatus::Reservada => inventory.reservadas = count,
            }
        }

        inventory.financiadas = motorcycle::Entity::find()
            .filter(motorcycle::Column::IsFinanced.eq(true))
            .count(db)
            .await?;
        inventory.atrasadas = motorcycle::Entity::find()
            .filter(motorcycle::Column::IsOverdue.eq(true))
            .count(db)
            .await?;

        let clients = client::Entity::find().count(db).await?;
        let totals = ledger_totals(db, None).await?;

        let rows: Vec<(NaiveDate, RecordType, Decimal)> = financial_record::Entity::find()
            .select_only()
            .column(financial_record::Column::Date)
            .column(financial_record::Column::RecordType)
            .column(financial_record::Column::Amount)
            .filter(financial_record::Column::Date.gte(month_start(today, MONTHS_SHOWN - 1)))
            .filter(financial_record::Column::Date.lt(next_month_start(today)))
            .into_tuple()
            .all(db)
            .await?;

        Ok(DashboardStats {
            inventory,
            totals,
            clients,
            monthly: bucket_rows(today, rows),
        })
    }
}
