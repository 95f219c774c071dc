use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::auth::store::{
    NewSession, NewUser, ProfileChanges, Session, SessionStore, StoreError, User, UserRole,
    UserStore,
};

/// In-memory implementation of both store traits. Backs `AppState::in_memory`
/// so the auth workflows can run without a database.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    sessions: Vec<Session>,
    next_user_id: i64,
    next_session_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_user_id: 1,
                next_session_id: 1,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }

    /// Test hook: accounts only become deactivated or verified through
    /// operations this crate does not expose, so tests set the flags directly.
    #[cfg(test)]
    pub(crate) fn set_account_flags(&self, user_id: i64, is_active: bool, email_verified: bool) {
        let mut inner = self.lock();
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == user_id) {
            user.is_active = is_active;
            user.email_verified = email_verified;
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.lock();
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: inner.next_user_id,
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: UserRole::User,
            is_active: true,
            email_verified: false,
            created_at: now,
            updated_at: now,
        };
        inner.next_user_id += 1;
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: i64,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut inner = self.lock();
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn rotate_password(&self, id: i64, new_hash: &str) -> Result<(), StoreError> {
        // Single lock covers both mutations, mirroring the Postgres transaction.
        let mut inner = self.lock();
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.password_hash = new_hash.to_string();
            user.updated_at = OffsetDateTime::now_utc();
        }
        inner.sessions.retain(|s| s.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, new_session: NewSession) -> Result<Session, StoreError> {
        let mut inner = self.lock();
        let session = Session {
            id: inner.next_session_id,
            user_id: new_session.user_id,
            token: new_session.token,
            expires_at: new_session.expires_at,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.next_session_id += 1;
        inner.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self
            .lock()
            .sessions
            .iter()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn delete_by_token(&self, token: &str) -> Result<(), StoreError> {
        self.lock().sessions.retain(|s| s.token != token);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: i64) -> Result<(), StoreError> {
        self.lock().sessions.retain(|s| s.user_id != user_id);
        Ok(())
    }

    async fn count_for_user(&self, user_id: i64) -> Result<i64, StoreError> {
        Ok(self
            .lock()
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .count() as i64)
    }

    async fn recent_created_at(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<OffsetDateTime>, StoreError> {
        let inner = self.lock();
        let mut stamps: Vec<OffsetDateTime> = inner
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.created_at)
            .collect();
        stamps.sort_unstable_by(|a, b| b.cmp(a));
        stamps.truncate(limit as usize);
        Ok(stamps)
    }
}
