pub mod auth;
pub mod clients;
pub mod common;
pub mod dashboard;
pub mod files;
pub mod financial;
pub mod images;
pub mod motorcycles;
pub mod users;

use crate::db::DbPool;
use crate::services::{
    clients::ClientService, dashboard::DashboardService, financial::FinancialService,
    images::ImageService, motorcycles::MotorcycleService, users::UserService,
};
use crate::storage::ImageStore;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub motorcycles: Arc<MotorcycleService>,
    pub images: Arc<ImageService>,
    pub clients: Arc<ClientService>,
    pub financial: Arc<FinancialService>,
    pub dashboard: Arc<DashboardService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, store: Arc<dyn ImageStore>, max_upload_bytes: usize) -> Self {
        Self {
            motorcycles: Arc::new(MotorcycleService::new(db_pool.clone(), store.clone())),
            images: Arc::new(ImageService::new(db_pool.clone(), store, max_upload_bytes)),
            clients: Arc::new(ClientService::new(db_pool.clone())),
            financial: Arc::new(FinancialService::new(db_pool.clone())),
            dashboard: Arc::new(DashboardService::new(db_pool.clone())),
            users: Arc::new(UserService::new(db_pool)),
        }
    }
}
