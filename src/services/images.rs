use crate::{
    db::DbPool,
    entities::{motorcycle, motorcycle_image},
    errors::ServiceError,
    storage::{allowed_image_type, motorcycle_image_key, ImageStore},
};
use axum::body::Bytes;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Gallery order: `display_order`, then insertion order
pub(crate) async fn ordered_images<C: ConnectionTrait>(
    conn: &C,
    motorcycle_id: i32,
) -> Result<Vec<motorcycle_image::Model>, ServiceError> {
    let images = motorcycle_image::Entity::find()
        .filter(motorcycle_image::Column::MotorcycleId.eq(motorcycle_id))
        .order_by_asc(motorcycle_image::Column::DisplayOrder)
        .order_by_asc(motorcycle_image::Column::Id)
        .all(conn)
        .await?;
    Ok(images)
}

/// An uploaded file as received from the multipart body
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
    pub display_order: Option<i32>,
}

/// Service for motorcycle galleries and their stored objects
#[derive(Clone)]
pub struct ImageService {
    db_pool: Arc<DbPool>,
    store: Arc<dyn ImageStore>,
    max_upload_bytes: usize,
}

impl ImageService {
    pub fn new(db_pool: Arc<DbPool>, store: Arc<dyn ImageStore>, max_upload_bytes: usize) -> Self {
        Self {
            db_pool,
            store,
            max_upload_bytes,
        }
    }

    /// Stores the file and records it in the motorcycle's gallery
    #[instrument(skip(self, upload), fields(filename = %upload.filename, size = upload.bytes.len()))]
    pub async fn upload(
        &self,
        motorcycle_id: i32,
        upload: ImageUpload,
    ) -> Result<motorcycle_image::Model, ServiceError> {
        if !upload.content_type.trim().to_ascii_lowercase().starts_with("image/") {
            return Err(ServiceError::bad_request("Arquivo deve ser uma imagem"));
        }
        let content_type = allowed_image_type(&upload.content_type).ok_or_else(|| {
            ServiceError::bad_request("Formato de imagem não suportado (use JPEG, PNG, GIF, WebP ou AVIF)")
        })?;
        if upload.bytes.is_empty() {
            return Err(ServiceError::bad_request("Nenhuma imagem enviada"));
        }
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(ServiceError::PayloadTooLarge(format!(
                "Imagem excede o limite de {} bytes",
                self.max_upload_bytes
            )));
        }

        if motorcycle::Entity::find_by_id(motorcycle_id)
            .one(&*self.db_pool)
            .await?
            .is_none()
        {
            return Err(ServiceError::not_found("Moto não encontrada"));
        }

        let now = Utc::now();
        let key = motorcycle_image_key(motorcycle_id, &upload.filename, now.timestamp_millis());
        self.store
            .put(&key, upload.bytes, content_type)
            .await?;

        let model = motorcycle_image::ActiveModel {
            motorcycle_id: Set(motorcycle_id),
            image_url: Set(self.store.public_url(&key)),
            storage_key: Set(key.clone()),
            display_order: Set(upload.display_order.unwrap_or(0)),
            created_at: Set(now),
            ..Default::default()
        };

        match model.insert(&*self.db_pool).await {
            Ok(image) => {
                info!(image_id = image.id, motorcycle_id, key = %key, "image uploaded");
                Ok(image)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&key).await {
                    warn!(key = %key, error = %cleanup, "failed to remove orphaned upload");
                }
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn list_images(
        &self,
        motorcycle_id: i32,
    ) -> Result<Vec<motorcycle_image::Model>, ServiceError> {
        ordered_images(&*self.db_pool, motorcycle_id).await
    }

    #[instrument(skip(self))]
    pub async fn reorder(
        &self,
        image_id: i32,
        display_order: i32,
    ) -> Result<motorcycle_image::Model, ServiceError> {
        let image = self.get_image(image_id).await?;
        let mut active: motorcycle_image::ActiveModel = image.into();
        active.display_order = Set(display_order);
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Removes the image row and clears the thumbnail if it pointed here
    #[instrument(skip(self))]
    pub async fn delete_image(&self, image_id: i32) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;

        let Some(image) = motorcycle_image::Entity::find_by_id(image_id).one(&txn).await? else {
            return Err(ServiceError::not_found("Imagem não encontrada"));
        };

        if let Some(owner) = motorcycle::Entity::find_by_id(image.motorcycle_id)
            .one(&txn)
            .await?
        {
            if owner.thumbnail_url.as_deref() == Some(image.image_url.as_str()) {
                let mut active: motorcycle::ActiveModel = owner.into();
                active.thumbnail_url = Set(None);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;
            }
        }

        motorcycle_image::Entity::delete_by_id(image_id)
            .exec(&txn)
            .await?;
        txn.commit().await?;

        if let Err(e) = self.store.delete(&image.storage_key).await {
            warn!(key = %image.storage_key, error = %e, "failed to delete stored image");
        }

        info!(image_id, motorcycle_id = image.motorcycle_id, "image deleted");
        Ok(())
    }

    pub async fn get_image(&self, image_id: i32) -> Result<motorcycle_image::Model, ServiceError> {
        motorcycle_image::Entity::find_by_id(image_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Imagem não encontrada"))
    }

    /// Raw object for the file-serving route
    pub async fn fetch_object(&self, key: &str) -> Result<crate::storage::StoredObject, ServiceError> {
        self.store
            .get(key)
            .await?
            .ok_or_else(|| ServiceError::not_found("Arquivo não encontrado"))
    }
}
