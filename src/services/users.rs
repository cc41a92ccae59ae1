use crate::{
    auth::{hash_password, verify_password, MIN_PASSWORD_LENGTH},
    db::DbPool,
    entities::user::{self, UserRole},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

/// Self-service sign-up payload
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RegisterInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Login payload
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Admin-side account creation payload
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateUserInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub name: Option<String>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Service for user accounts and credential checks
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Registers a regular user account
    #[instrument(skip(self, input), fields(email = ?input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<user::Model, ServiceError> {
        let (Some(email), Some(password)) = (present(&input.email), present(&input.password))
        else {
            return Err(ServiceError::bad_request("Email e senha são obrigatórios"));
        };

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::bad_request(
                "A senha deve ter pelo menos 6 caracteres",
            ));
        }

        let email = normalize_email(email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::bad_request("Este email já está cadastrado"));
        }

        self.insert(email, password, input.name, UserRole::User)
            .await
            .map_err(|e| match e {
                ServiceError::Conflict(_) => {
                    ServiceError::bad_request("Este email já está cadastrado")
                }
                other => other,
            })
    }

    /// Checks credentials and returns the matching user
    #[instrument(skip(self, input), fields(email = ?input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<user::Model, ServiceError> {
        let (Some(email), Some(password)) = (present(&input.email), present(&input.password))
        else {
            return Err(ServiceError::bad_request("Email e senha são obrigatórios"));
        };

        let invalid = || ServiceError::Unauthorized("Email ou senha inválidos".to_string());

        let user = self
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = user.id, "login rejected: wrong password");
            return Err(invalid());
        }

        info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    /// Creates an account with an explicit role
    #[instrument(skip(self, input), fields(email = ?input.email, role = ?input.role))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<user::Model, ServiceError> {
        let (Some(email), Some(password), Some(role)) = (
            present(&input.email),
            present(&input.password),
            present(&input.role),
        ) else {
            return Err(ServiceError::bad_request(
                "Email, senha e role são obrigatórios",
            ));
        };

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::bad_request(
                "A senha deve ter no mínimo 6 caracteres",
            ));
        }

        let role: UserRole = role
            .trim()
            .parse()
            .map_err(|_| ServiceError::bad_request("Role inválida"))?;

        let email = normalize_email(email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(
                "Usuário com este email já existe".to_string(),
            ));
        }

        self.insert(email, password, input.name, role).await
    }

    /// All users, newest first
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<user::Model>, ServiceError> {
        let users = user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .order_by_desc(user::Column::Id)
            .all(&*self.db_pool)
            .await?;
        Ok(users)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Usuário não encontrado"))
    }

    /// Deletes a user on behalf of `acting_user_id`
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i32, acting_user_id: i32) -> Result<(), ServiceError> {
        if id == acting_user_id {
            return Err(ServiceError::bad_request(
                "Não é possível remover o próprio usuário",
            ));
        }

        let result = user::Entity::delete_by_id(id).exec(&*self.db_pool).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Usuário não encontrado"));
        }

        info!(user_id = id, "user deleted");
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db_pool)
            .await?;
        Ok(user)
    }

    async fn insert(
        &self,
        email: String,
        password: &str,
        name: Option<String>,
        role: UserRole,
    ) -> Result<user::Model, ServiceError> {
        let now = Utc::now();
        let model = user::ActiveModel {
            email: Set(email),
            name: Set(crate::common::non_blank(name)),
            password_hash: Set(hash_password(password)?),
            role: Set(role),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = model.insert(&*self.db_pool).await.map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::Conflict("Usuário com este email já existe".to_string())
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        info!(user_id = created.id, role = %created.role, "user created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    async fn service() -> UserService {
        UserService::new(Arc::new(crate::db::test_pool().await))
    }

    fn register(email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            email: Some(email.into()),
            password: Some(password.into()),
            name: None,
        }
    }

    #[tokio::test]
    async fn register_normalizes_email_and_rejects_duplicates() {
        let users = service().await;
        let user = users
            .register(register("  Joao@Example.COM ", "segredo"))
            .await
            .unwrap();
        assert_eq!(user.email, "joao@example.com");
        assert_eq!(user.role, UserRole::User);

        let err = users
            .register(register("joao@example.com", "segredo"))
            .await
            .unwrap_err();
        assert_eq!(err.response_message(), "Este email já está cadastrado");
    }

    #[tokio::test]
    async fn login_checks_password() {
        let users = service().await;
        users.register(register("ana@example.com", "123456")).await.unwrap();

        let ok = users
            .login(LoginInput {
                email: Some("ANA@example.com".into()),
                password: Some("123456".into()),
            })
            .await;
        assert!(ok.is_ok());

        let err = users
            .login(LoginInput {
                email: Some("ana@example.com".into()),
                password: Some("1234567".into()),
            })
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Unauthorized(_));
    }

    #[tokio::test]
    async fn create_user_validates_role() {
        let users = service().await;
        let err = users
            .create_user(CreateUserInput {
                email: Some("x@example.com".into()),
                password: Some("123456".into()),
                role: Some("superuser".into()),
                name: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.response_message(), "Role inválida");
    }

    #[tokio::test]
    async fn users_cannot_delete_themselves() {
        let users = service().await;
        let err = users.delete_user(3, 3).await.unwrap_err();
        assert_eq!(err.response_message(), "Não é possível remover o próprio usuário");

        let err = users.delete_user(99, 3).await.unwrap_err();
        assert_matches!(err, ServiceError::NotFound(_));
    }
}
