use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::SESSION_COOKIE;

/// Path of the generated document
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Repasses API",
        version = "0.1.0",
        description = r#"
# Repasses API

Backend of a motorcycle resale business.

- **Catalog**: public listing, featured motorcycles and detail pages with photo galleries
- **Admin**: motorcycle and image management, clients, financial ledger, dashboard figures and user accounts

## Authentication

Protected endpoints accept the session JWT either as a bearer token or as the
`repasses_session` cookie set by `/api/auth/login`:

```
Authorization: Bearer <jwt>
```

## Errors

Every failure uses the same body:

```json
{
  "error": "Moto não encontrada",
  "request_id": "8a6e0804-2bd0-4672-b79d-d97027f9071a",
  "timestamp": "2025-03-09T10:30:00.000Z"
}
```
        "#
    ),
    tags(
        (name = "auth", description = "Sign-up, login and session endpoints"),
        (name = "users", description = "Account management (admin)"),
        (name = "motorcycles", description = "Catalog endpoints"),
        (name = "images", description = "Motorcycle galleries and stored files"),
        (name = "clients", description = "Client register"),
        (name = "financial", description = "Financial ledger"),
        (name = "dashboard", description = "Admin dashboard figures"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,

        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::delete_user,

        crate::handlers::motorcycles::list_motorcycles,
        crate::handlers::motorcycles::list_featured,
        crate::handlers::motorcycles::get_motorcycle,
        crate::handlers::motorcycles::create_motorcycle,
        crate::handlers::motorcycles::update_motorcycle,
        crate::handlers::motorcycles::delete_motorcycle,
        crate::handlers::motorcycles::set_thumbnail,

        crate::handlers::images::upload_image,
        crate::handlers::images::list_images,
        crate::handlers::images::reorder_image,
        crate::handlers::images::delete_image,
        crate::handlers::files::serve_file,

        crate::handlers::clients::list_clients,
        crate::handlers::clients::get_client,
        crate::handlers::clients::create_client,
        crate::handlers::clients::update_client,
        crate::handlers::clients::delete_client,

        crate::handlers::financial::list_records,
        crate::handlers::financial::get_record,
        crate::handlers::financial::create_record,
        crate::handlers::financial::update_record,
        crate::handlers::financial::delete_record,
        crate::handlers::financial::summary,
        crate::handlers::financial::categories,

        crate::handlers::dashboard::get_stats,

        crate::health::health_check,
        crate::health::liveness_check,
        crate::health::readiness_check,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::handlers::common::SuccessResponse,
            crate::entities::user::UserRole,
            crate::entities::motorcycle::MotorcycleStatus,
            crate::entities::financial_record::RecordType,
            crate::services::motorcycles::SortBy,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer and cookie schemes referenced by `security(...)`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "Cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url(OPENAPI_JSON_PATH, ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from(OPENAPI_JSON_PATH).try_it_out_enabled(true))
}
