#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use repasses_api::{
    config::AppConfig,
    db,
    entities::user::{self, UserRole},
    services::users::{CreateUserInput, UserService},
    storage::InMemoryImageStore,
    AppState,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@repasses.test";
pub const USER_EMAIL: &str = "vendedor@repasses.test";
pub const PASSWORD: &str = "segredo123";

/// Upload cap used by the harness, small enough to exceed cheaply
pub const TEST_MAX_UPLOAD_BYTES: usize = 16 * 1024;

const MULTIPART_BOUNDARY: &str = "repasses-test-boundary";

/// Helper harness for spinning up the application against a fresh SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryImageStore>,
    pub admin: user::Model,
    pub user: user::Model,
    admin_token: String,
    user_token: String,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("repasses_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.storage_backend = "memory".to_string();
        cfg.max_upload_bytes = TEST_MAX_UPLOAD_BYTES;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let store = Arc::new(InMemoryImageStore::new());
        let state = AppState::new(db_arc.clone(), cfg, store.clone());

        let users = UserService::new(db_arc);
        let admin = create_account(&users, ADMIN_EMAIL, UserRole::Admin).await;
        let user = create_account(&users, USER_EMAIL, UserRole::User).await;

        let admin_token = state.auth.issue_token(&admin).expect("issue admin token").token;
        let user_token = state.auth.issue_token(&user).expect("issue user token").token;

        Self {
            router: repasses_api::build_router(state.clone()),
            state,
            store,
            admin,
            user,
            admin_token,
            user_token,
            _db_dir: db_dir,
        }
    }

    /// Bearer token of the seeded admin account.
    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Bearer token of the seeded `user` account.
    pub fn user_token(&self) -> &str {
        &self.user_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Convenience helper for requests made as the admin.
    pub async fn as_admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request(method, uri, body, Some(self.admin_token()))
            .await
    }

    /// Sends a request authenticated only by the session cookie.
    pub async fn request_with_cookie(&self, method: Method, uri: &str, token: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("repasses_session={}", token))
            .body(Body::empty())
            .expect("failed to build request");
        self.send(request).await
    }

    /// Posts a multipart form with an `image` file and an optional `display_order` field.
    pub async fn upload_image(
        &self,
        motorcycle_id: i32,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
        display_order: Option<i32>,
        token: Option<&str>,
    ) -> Response {
        let mut body = Vec::new();
        if let Some(order) = display_order {
            body.extend_from_slice(
                format!(
                    "--{b}\r\nContent-Disposition: form-data; name=\"display_order\"\r\n\r\n{order}\r\n",
                    b = MULTIPART_BOUNDARY
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n",
                b = MULTIPART_BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/motorcycles/{}/images", motorcycle_id))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            );
        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }
        self.send(builder.body(Body::from(body)).expect("failed to build request"))
            .await
    }

    /// Creates a motorcycle as the admin and returns its JSON representation.
    pub async fn create_motorcycle(&self, overrides: Value) -> Value {
        let mut payload = json!({
            "brand": "Honda",
            "model": "CG 160 Titan",
            "year": 2022,
            "price": 14900.0,
            "mileage": 12000,
            "displacement": 160
        });
        merge(&mut payload, overrides);

        let response = self
            .as_admin(Method::POST, "/api/motorcycles", Some(payload))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    /// Creates a client as the admin and returns its JSON representation.
    pub async fn create_client(&self, payload: Value) -> Value {
        let response = self
            .as_admin(Method::POST, "/api/clients", Some(payload))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    /// Creates a financial record as the admin and returns its JSON representation.
    pub async fn create_record(&self, payload: Value) -> Value {
        let response = self
            .as_admin(Method::POST, "/api/financial/records", Some(payload))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

async fn create_account(users: &UserService, email: &str, role: UserRole) -> user::Model {
    users
        .create_user(CreateUserInput {
            email: Some(email.to_string()),
            password: Some(PASSWORD.to_string()),
            role: Some(role.to_string()),
            name: Some(format!("Conta {}", role)),
        })
        .await
        .expect("create test account")
}

fn merge(target: &mut Value, overrides: Value) {
    if let (Some(target), Value::Object(extra)) = (target.as_object_mut(), overrides) {
        for (key, value) in extra {
            target.insert(key, value);
        }
    }
}

/// Reads the whole body as raw bytes.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes()
        .to_vec()
}

/// Reads the whole body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

/// Asserts the status and returns the `error` message of an error body.
pub async fn expect_error(response: Response, status: StatusCode) -> String {
    assert_eq!(response.status(), status);
    let body = body_json(response).await;
    body["error"]
        .as_str()
        .expect("error body carries a message")
        .to_string()
}
