use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;

/// Account role. Stored as the `user_role` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 digest, never exposed in JSON
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Session record binding a bearer token to a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// Fields the caller supplies when creating a user. Role and the
/// active/verified flags take their store defaults.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
}

/// Typed access to user records. Injected into the auth service so tests
/// can substitute an in-memory implementation.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Applies the present fields and bumps `updated_at` unconditionally.
    async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError>;

    /// Replaces the password hash and deletes every session of the user as
    /// one atomic unit, so a concurrent login can never observe the new hash
    /// alongside still-valid old sessions.
    async fn rotate_password(&self, id: i64, new_hash: &str) -> Result<(), StoreError>;
}

/// Typed access to session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, new_session: NewSession) -> Result<Session, StoreError>;

    /// Returns the row even if expired; expiry is the session manager's check.
    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// No-op when no row matches.
    async fn delete_by_token(&self, token: &str) -> Result<(), StoreError>;

    /// Idempotent; safe when the user has no sessions.
    async fn delete_for_user(&self, user_id: i64) -> Result<(), StoreError>;

    async fn count_for_user(&self, user_id: i64) -> Result<i64, StoreError>;

    /// Session creation timestamps for the user, most recent first.
    async fn recent_created_at(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<OffsetDateTime>, StoreError>;
}
