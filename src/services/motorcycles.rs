use crate::{
    common::{contains_ci, non_blank, nullable},
    db::DbPool,
    entities::{
        motorcycle::{self, MotorcycleStatus},
        motorcycle_image,
    },
    errors::ServiceError,
    storage::ImageStore,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::{finance_non_negative, price_non_negative};

/// Number of motorcycles shown on the home page
pub const FEATURED_LIMIT: u64 = 6;

/// Sort orders accepted by the catalog listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    PriceAsc,
    PriceDesc,
    YearAsc,
    YearDesc,
    Newest,
}

/// Catalog filters, all optional and combined with AND
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MotorcycleFilters {
    /// Case-insensitive substring of the brand
    pub brand: Option<String>,
    /// Case-insensitive substring of the model
    pub model: Option<String>,
    #[serde(rename = "minYear")]
    pub min_year: Option<i32>,
    #[serde(rename = "maxYear")]
    pub max_year: Option<i32>,
    #[serde(rename = "minPrice")]
    #[param(value_type = Option<f64>)]
    pub min_price: Option<Decimal>,
    #[serde(rename = "maxPrice")]
    #[param(value_type = Option<f64>)]
    pub max_price: Option<Decimal>,
    #[serde(rename = "minMileage")]
    pub min_mileage: Option<i32>,
    #[serde(rename = "maxMileage")]
    pub max_mileage: Option<i32>,
    #[serde(rename = "minDisplacement")]
    pub min_displacement: Option<i32>,
    #[serde(rename = "maxDisplacement")]
    pub max_displacement: Option<i32>,
    pub condition: Option<String>,
    pub is_financed: Option<bool>,
    #[param(value_type = Option<MotorcycleStatus>)]
    pub status: Option<MotorcycleStatus>,
    /// One of price_asc, price_desc, year_asc, year_desc, newest
    #[serde(rename = "sortBy", default, deserialize_with = "lenient_sort")]
    #[param(value_type = Option<String>)]
    pub sort_by: Option<SortBy>,
}

// Unknown sort keys fall back to the default order instead of failing the request.
fn lenient_sort<'de, D>(deserializer: D) -> Result<Option<SortBy>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        serde_json::from_value::<SortBy>(serde_json::Value::String(s)).ok()
    }))
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMotorcycleInput {
    #[validate(length(min = 1, message = "Marca é obrigatória"))]
    pub brand: String,
    #[validate(length(min = 1, message = "Modelo é obrigatório"))]
    pub model: String,
    #[validate(range(min = 1900, max = 2100, message = "Ano deve estar entre 1900 e 2100"))]
    pub year: i32,
    pub color: Option<String>,
    #[validate(range(min = 0, message = "Quilometragem não pode ser negativa"))]
    pub mileage: Option<i32>,
    #[validate(range(min = 0, message = "Cilindrada não pode ser negativa"))]
    pub displacement: Option<i32>,
    #[validate(custom = "price_non_negative")]
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub payment_methods: Option<String>,
    pub features: Option<String>,
    pub status: Option<MotorcycleStatus>,
    pub is_featured: Option<bool>,
    pub is_financed: Option<bool>,
    pub is_overdue: Option<bool>,
    pub is_worth_financing: Option<bool>,
    #[validate(range(min = 0, message = "Dias restantes não podem ser negativos"))]
    pub finance_days_remaining: Option<i32>,
    #[validate(custom = "finance_non_negative")]
    #[schema(value_type = Option<f64>)]
    pub finance_monthly_payment: Option<Decimal>,
    #[validate(custom = "finance_non_negative")]
    #[schema(value_type = Option<f64>)]
    pub finance_total_remaining: Option<Decimal>,
    pub thumbnail_url: Option<String>,
}

/// Partial update. Nullable columns accept `null` to clear them.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMotorcycleInput {
    #[validate(length(min = 1, message = "Marca é obrigatória"))]
    pub brand: Option<String>,
    #[validate(length(min = 1, message = "Modelo é obrigatório"))]
    pub model: Option<String>,
    #[validate(range(min = 1900, max = 2100, message = "Ano deve estar entre 1900 e 2100"))]
    pub year: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub color: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(range(min = 0, message = "Quilometragem não pode ser negativa"))]
    #[schema(value_type = Option<i32>)]
    pub mileage: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(range(min = 0, message = "Cilindrada não pode ser negativa"))]
    #[schema(value_type = Option<i32>)]
    pub displacement: Option<Option<i32>>,
    #[validate(custom = "price_non_negative")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub condition: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub payment_methods: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub features: Option<Option<String>>,
    pub status: Option<MotorcycleStatus>,
    pub is_featured: Option<bool>,
    pub is_financed: Option<bool>,
    pub is_overdue: Option<bool>,
    pub is_worth_financing: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(range(min = 0, message = "Dias restantes não podem ser negativos"))]
    #[schema(value_type = Option<i32>)]
    pub finance_days_remaining: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(custom = "finance_non_negative")]
    #[schema(value_type = Option<f64>)]
    pub finance_monthly_payment: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    #[validate(custom = "finance_non_negative")]
    #[schema(value_type = Option<f64>)]
    pub finance_total_remaining: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub thumbnail_url: Option<Option<String>>,
}

impl UpdateMotorcycleInput {
    pub fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.model.is_none()
            && self.year.is_none()
            && self.color.is_none()
            && self.mileage.is_none()
            && self.displacement.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.condition.is_none()
            && self.payment_methods.is_none()
            && self.features.is_none()
            && self.status.is_none()
            && self.is_featured.is_none()
            && self.is_financed.is_none()
            && self.is_overdue.is_none()
            && self.is_worth_financing.is_none()
            && self.finance_days_remaining.is_none()
            && self.finance_monthly_payment.is_none()
            && self.finance_total_remaining.is_none()
            && self.thumbnail_url.is_none()
    }
}

/// Applies the status transition and keeps `sold_at` consistent with it
fn apply_status(
    model: &mut motorcycle::ActiveModel,
    current: Option<MotorcycleStatus>,
    next: MotorcycleStatus,
) {
    model.status = Set(next);
    match (current, next) {
        (Some(MotorcycleStatus::Vendida), MotorcycleStatus::Vendida) => {}
        (_, MotorcycleStatus::Vendida) => model.sold_at = Set(Some(Utc::now())),
        (_, _) => model.sold_at = Set(None),
    }
}

/// Marks a motorcycle as sold on the given connection
pub(crate) async fn mark_sold<C: ConnectionTrait>(
    conn: &C,
    motorcycle_id: i32,
) -> Result<(), ServiceError> {
    let Some(existing) = motorcycle::Entity::find_by_id(motorcycle_id).one(conn).await? else {
        return Err(ServiceError::not_found("Moto não encontrada"));
    };

    if existing.status == MotorcycleStatus::Vendida {
        return Ok(());
    }

    let current = existing.status;
    let mut active: motorcycle::ActiveModel = existing.into();
    apply_status(&mut active, Some(current), MotorcycleStatus::Vendida);
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;
    info!(motorcycle_id, "motorcycle marked as sold");
    Ok(())
}

/// Service for the motorcycle catalog
#[derive(Clone)]
pub struct MotorcycleService {
    db_pool: Arc<DbPool>,
    store: Arc<dyn ImageStore>,
}

impl MotorcycleService {
    pub fn new(db_pool: Arc<DbPool>, store: Arc<dyn ImageStore>) -> Self {
        Self { db_pool, store }
    }

    fn filtered(filters: &MotorcycleFilters) -> Select<motorcycle::Entity> {
        use motorcycle::Column;

        let mut query = motorcycle::Entity::find();

        if let Some(brand) = filters.brand.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(contains_ci(Column::Brand, brand.trim()));
        }
        if let Some(model) = filters.model.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(contains_ci(Column::Model, model.trim()));
        }
        if let Some(v) = filters.min_year {
            query = query.filter(Column::Year.gte(v));
        }
        if let Some(v) = filters.max_year {
            query = query.filter(Column::Year.lte(v));
        }
        if let Some(v) = filters.min_price {
            query = query.filter(Column::Price.gte(v));
        }
        if let Some(v) = filters.max_price {
            query = query.filter(Column::Price.lte(v));
        }
        if let Some(v) = filters.min_mileage {
            query = query.filter(Column::Mileage.gte(v));
        }
        if let Some(v) = filters.max_mileage {
            query = query.filter(Column::Mileage.lte(v));
        }
        if let Some(v) = filters.min_displacement {
            query = query.filter(Column::Displacement.gte(v));
        }
        if let Some(v) = filters.max_displacement {
            query = query.filter(Column::Displacement.lte(v));
        }
        if let Some(condition) = filters.condition.as_deref().filter(|s| !s.is_empty()) {
            query = query.filter(Column::Condition.eq(condition));
        }
        if let Some(v) = filters.is_financed {
            query = query.filter(Column::IsFinanced.eq(v));
        }
        if let Some(status) = filters.status {
            query = query.filter(Column::Status.eq(status));
        }

        match filters.sort_by {
            Some(SortBy::PriceAsc) => query.order_by_asc(Column::Price),
            Some(SortBy::PriceDesc) => query.order_by_desc(Column::Price),
            Some(SortBy::YearAsc) => query.order_by_asc(Column::Year),
            Some(SortBy::YearDesc) => query.order_by_desc(Column::Year),
            Some(SortBy::Newest) | None => query.order_by_desc(Column::CreatedAt),
        }
        .order_by_desc(Column::Id)
    }

    /// Public catalog listing
    #[instrument(skip(self))]
    pub async fn list_motorcycles(
        &self,
        filters: MotorcycleFilters,
    ) -> Result<Vec<motorcycle::Model>, ServiceError> {
        let motorcycles = Self::filtered(&filters).all(&*self.db_pool).await?;
        Ok(motorcycles)
    }

    #[instrument(skip(self))]
    pub async fn list_featured(&self) -> Result<Vec<motorcycle::Model>, ServiceError> {
        let motorcycles = motorcycle::Entity::find()
            .filter(motorcycle::Column::IsFeatured.eq(true))
            .order_by_desc(motorcycle::Column::CreatedAt)
            .order_by_desc(motorcycle::Column::Id)
            .limit(FEATURED_LIMIT)
            .all(&*self.db_pool)
            .await?;
        Ok(motorcycles)
    }

    #[instrument(skip(self))]
    pub async fn get_motorcycle(&self, id: i32) -> Result<motorcycle::Model, ServiceError> {
        motorcycle::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Moto não encontrada"))
    }

    /// Motorcycle together with its gallery
    #[instrument(skip(self))]
    pub async fn get_with_images(
        &self,
        id: i32,
    ) -> Result<(motorcycle::Model, Vec<motorcycle_image::Model>), ServiceError> {
        let motorcycle = self.get_motorcycle(id).await?;
        let images = super::images::ordered_images(&*self.db_pool, id).await?;
        Ok((motorcycle, images))
    }

    #[instrument(skip(self, input), fields(brand = %input.brand, model = %input.model))]
    pub async fn create_motorcycle(
        &self,
        input: CreateMotorcycleInput,
    ) -> Result<motorcycle::Model, ServiceError> {
        input.validate()?;

        let brand = input.brand.trim().to_string();
        let model_name = input.model.trim().to_string();
        if brand.is_empty() || model_name.is_empty() {
            return Err(ServiceError::bad_request("Marca e modelo são obrigatórios"));
        }

        let now = Utc::now();
        let mut model = motorcycle::ActiveModel {
            brand: Set(brand),
            model: Set(model_name),
            year: Set(input.year),
            color: Set(non_blank(input.color)),
            mileage: Set(input.mileage),
            displacement: Set(input.displacement),
            price: Set(input.price),
            description: Set(non_blank(input.description)),
            condition: Set(non_blank(input.condition)),
            payment_methods: Set(non_blank(input.payment_methods)),
            features: Set(non_blank(input.features)),
            is_featured: Set(input.is_featured.unwrap_or(false)),
            is_financed: Set(input.is_financed.unwrap_or(false)),
            is_overdue: Set(input.is_overdue.unwrap_or(false)),
            is_worth_financing: Set(input.is_worth_financing.unwrap_or(false)),
            finance_days_remaining: Set(input.finance_days_remaining),
            finance_monthly_payment: Set(input.finance_monthly_payment),
            finance_total_remaining: Set(input.finance_total_remaining),
            thumbnail_url: Set(non_blank(input.thumbnail_url)),
            sold_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        apply_status(&mut model, None, input.status.unwrap_or_default());

        let created = model.insert(&*self.db_pool).await?;
        info!(motorcycle_id = created.id, "motorcycle created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_motorcycle(
        &self,
        id: i32,
        input: UpdateMotorcycleInput,
    ) -> Result<motorcycle::Model, ServiceError> {
        if input.is_empty() {
            return Err(ServiceError::bad_request("Nenhum campo para atualizar"));
        }
        input.validate()?;

        let existing = self.get_motorcycle(id).await?;
        let current_status = existing.status;
        let mut model: motorcycle::ActiveModel = existing.into();

        if let Some(brand) = input.brand {
            model.brand = Set(brand.trim().to_string());
        }
        if let Some(name) = input.model {
            model.model = Set(name.trim().to_string());
        }
        if let Some(year) = input.year {
            model.year = Set(year);
        }
        if let Some(color) = input.color {
            model.color = Set(non_blank(color));
        }
        if let Some(mileage) = input.mileage {
            model.mileage = Set(mileage);
        }
        if let Some(displacement) = input.displacement {
            model.displacement = Set(displacement);
        }
        if let Some(price) = input.price {
            model.price = Set(price);
        }
        if let Some(description) = input.description {
            model.description = Set(non_blank(description));
        }
        if let Some(condition) = input.condition {
            model.condition = Set(non_blank(condition));
        }
        if let Some(payment_methods) = input.payment_methods {
            model.payment_methods = Set(non_blank(payment_methods));
        }
        if let Some(features) = input.features {
            model.features = Set(non_blank(features));
        }
        if let Some(v) = input.is_featured {
            model.is_featured = Set(v);
        }
        if let Some(v) = input.is_financed {
            model.is_financed = Set(v);
        }
        if let Some(v) = input.is_overdue {
            model.is_overdue = Set(v);
        }
        if let Some(v) = input.is_worth_financing {
            model.is_worth_financing = Set(v);
        }
        if let Some(v) = input.finance_days_remaining {
            model.finance_days_remaining = Set(v);
        }
        if let Some(v) = input.finance_monthly_payment {
            model.finance_monthly_payment = Set(v);
        }
        if let Some(v) = input.finance_total_remaining {
            model.finance_total_remaining = Set(v);
        }
        if let Some(v) = input.thumbnail_url {
            model.thumbnail_url = Set(non_blank(v));
        }
        if let Some(status) = input.status {
            apply_status(&mut model, Some(current_status), status);
        }
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db_pool).await?;
        info!(motorcycle_id = id, status = %updated.status, "motorcycle updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn set_thumbnail(
        &self,
        id: i32,
        thumbnail_url: Option<String>,
    ) -> Result<motorcycle::Model, ServiceError> {
        let existing = self.get_motorcycle(id).await?;
        let mut model: motorcycle::ActiveModel = existing.into();
        model.thumbnail_url = Set(non_blank(thumbnail_url));
        model.updated_at = Set(Utc::now());
        Ok(model.update(&*self.db_pool).await?)
    }

    /// Removes a motorcycle, its image rows and the stored image objects
    #[instrument(skip(self))]
    pub async fn delete_motorcycle(&self, id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;

        if motorcycle::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(ServiceError::not_found("Moto não encontrada"));
        }

        let images = motorcycle_image::Entity::find()
            .filter(motorcycle_image::Column::MotorcycleId.eq(id))
            .all(&txn)
            .await?;

        motorcycle_image::Entity::delete_many()
            .filter(motorcycle_image::Column::MotorcycleId.eq(id))
            .exec(&txn)
            .await?;

        motorcycle::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        // stored objects go last: a failure here leaves orphans, never dangling rows
        for image in &images {
            if let Err(e) = self.store.delete(&image.storage_key).await {
                warn!(key = %image.storage_key, error = %e, "failed to delete stored image");
            }
        }

        info!(motorcycle_id = id, images = images.len(), "motorcycle deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryImageStore;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    async fn service() -> MotorcycleService {
        let pool = Arc::new(crate::db::test_pool().await);
        MotorcycleService::new(pool, Arc::new(InMemoryImageStore::new()))
    }

    fn input(brand: &str, year: i32, price: Decimal) -> CreateMotorcycleInput {
        serde_json::from_value(serde_json::json!({
            "brand": brand,
            "model": "Modelo",
            "year": year,
            "price": price,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn sold_at_follows_status() {
        let svc = service().await;
        let created = svc.create_motorcycle(input("Honda", 2020, dec!(15000))).await.unwrap();
        assert_eq!(created.status, MotorcycleStatus::Disponivel);
        assert!(created.sold_at.is_none());

        let sold = svc
            .update_motorcycle(
                created.id,
                UpdateMotorcycleInput {
                    status: Some(MotorcycleStatus::Vendida),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(sold.sold_at.is_some());

        let reopened = svc
            .update_motorcycle(
                created.id,
                UpdateMotorcycleInput {
                    status: Some(MotorcycleStatus::Reservada),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(reopened.sold_at.is_none());
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let svc = service().await;
        let err = svc
            .update_motorcycle(1, UpdateMotorcycleInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.response_message(), "Nenhum campo para atualizar");
    }

    #[tokio::test]
    async fn year_out_of_range_is_rejected() {
        let svc = service().await;
        let err = svc
            .create_motorcycle(input("Honda", 1899, dec!(1000)))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError { .. });
    }

    #[tokio::test]
    async fn filters_combine() {
        let svc = service().await;
        svc.create_motorcycle(input("Honda", 2018, dec!(12000))).await.unwrap();
        svc.create_motorcycle(input("Yamaha", 2021, dec!(25000))).await.unwrap();
        svc.create_motorcycle(input("honda", 2022, dec!(30000))).await.unwrap();

        let hondas = svc
            .list_motorcycles(MotorcycleFilters {
                brand: Some("HON".into()),
                min_year: Some(2020),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hondas.len(), 1);
        assert_eq!(hondas[0].year, 2022);

        let cheapest_first = svc
            .list_motorcycles(MotorcycleFilters {
                sort_by: Some(SortBy::PriceAsc),
                ..Default::default()
            })
            .await
            .unwrap();
        let prices: Vec<_> = cheapest_first.iter().map(|m| m.price).collect();
        assert_eq!(prices, vec![dec!(12000), dec!(25000), dec!(30000)]);
    }

    #[test]
    fn unknown_sort_falls_back_to_default() {
        let filters: MotorcycleFilters =
            serde_json::from_value(serde_json::json!({"sortBy": "cheapest"})).unwrap();
        assert_eq!(filters.sort_by, None);
        let filters: MotorcycleFilters =
            serde_json::from_value(serde_json::json!({"sortBy": "year_desc"})).unwrap();
        assert_eq!(filters.sort_by, Some(SortBy::YearDesc));
    }
}
