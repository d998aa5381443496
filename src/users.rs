/// User accounts
///
/// The repository is the only thing the auth layer knows about persistence:
/// lookup by email, lookup by id, insert and list. Email and username are
/// unique.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::Role;
use crate::error::{AppError, DatabaseError};

#[derive(Debug, Clone)]
pub struct User {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public account view; never carries the password hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct UserView {
    pub uid: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            uid: user.uid,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_verified: user.is_verified,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: Role,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, uid: Uuid) -> Result<Option<User>, AppError>;

    /// # Errors
    /// `DatabaseError::UniqueConstraintViolation` when email or username is taken
    async fn insert(&self, user: NewUser) -> Result<User, AppError>;

    async fn list(&self) -> Result<Vec<User>, AppError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    uid: Uuid,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    is_verified: bool,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| AppError::Database(DatabaseError::UnexpectedError(e)))?;

        Ok(User {
            uid: row.uid,
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            is_verified: row.is_verified,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str =
    "uid, username, email, first_name, last_name, is_verified, password_hash, role, created_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM user_accounts WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, uid: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM user_accounts WHERE uid = $1",
            USER_COLUMNS
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO user_accounts
                (uid, username, email, first_name, last_name, is_verified, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, false, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        User::try_from(row)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM user_accounts ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}

/// In-process repository with the same uniqueness rules
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, uid: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&uid).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;

        if let Some(taken) = users.values().find_map(|u| {
            if u.email == user.email {
                Some("user_accounts_email_key")
            } else if u.username == user.username {
                Some("user_accounts_username_key")
            } else {
                None
            }
        }) {
            return Err(DatabaseError::UniqueConstraintViolation(taken.to_string()).into());
        }

        let created = User {
            uid: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_verified: false,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        users.insert(created.uid, created.clone());

        Ok(created)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}
