use std::sync::Arc;

use axum::extract::FromRef;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::auth::store::{NewSession, Session, SessionStore, StoreError, User, UserStore};
use crate::auth::token::generate_token;
use crate::state::AppState;

/// Session lifecycle: creation with a fixed TTL, token resolution with lazy
/// expiry, and invalidation. Holds injected store handles only.
#[derive(Clone)]
pub struct SessionManager {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl FromRef<AppState> for SessionManager {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            state.sessions.clone(),
            state.config.session_ttl_hours,
        )
    }
}

impl SessionManager {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        ttl_hours: i64,
    ) -> Self {
        Self {
            users,
            sessions,
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Inserts a fresh session expiring `ttl` from now. Never deduplicates;
    /// concurrent sessions per user are allowed.
    pub async fn create_session(&self, user_id: i64) -> Result<Session, StoreError> {
        let session = self
            .sessions
            .insert(NewSession {
                user_id,
                token: generate_token(),
                expires_at: OffsetDateTime::now_utc() + self.ttl,
            })
            .await?;
        debug!(user_id, session_id = session.id, "session created");
        Ok(session)
    }

    /// Single authorization gate: the token must match a row, the row must
    /// not be expired, and the owning account must be active. Partial
    /// validity still denies.
    pub async fn resolve(&self, token: &str) -> Result<Option<(User, Session)>, StoreError> {
        match self.lookup(token).await? {
            Some((user, _)) if !user.is_active => Ok(None),
            other => Ok(other),
        }
    }

    /// Like `resolve` but without the `is_active` check. Credential and
    /// profile mutations deliberately accept deactivated accounts.
    pub async fn lookup(&self, token: &str) -> Result<Option<(User, Session)>, StoreError> {
        let Some(session) = self.sessions.find_by_token(token).await? else {
            return Ok(None);
        };
        if session.expires_at <= OffsetDateTime::now_utc() {
            // Lazy expiry: the row may still exist, but it is invalid.
            return Ok(None);
        }
        let Some(user) = self.users.find_by_id(session.user_id).await? else {
            return Ok(None);
        };
        Ok(Some((user, session)))
    }

    /// Deletes the matching session if present; success either way, so the
    /// caller learns nothing about whether the token existed.
    pub async fn invalidate_one(&self, token: &str) -> Result<(), StoreError> {
        self.sessions.delete_by_token(token).await
    }

    /// Deletes every session of the user. Idempotent.
    pub async fn invalidate_all(&self, user_id: i64) -> Result<(), StoreError> {
        self.sessions.delete_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryStore;
    use crate::auth::store::NewUser;

    fn manager() -> (Arc<MemoryStore>, SessionManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(store.clone(), store.clone(), 24);
        (store, manager)
    }

    async fn seed_user(store: &MemoryStore) -> User {
        UserStore::insert(
            store,
            NewUser {
                email: "a@x.com".into(),
                password_hash: "hash".into(),
                first_name: "A".into(),
                last_name: "B".into(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn created_session_resolves_to_owner() {
        let (store, manager) = manager();
        let user = seed_user(&store).await;

        let session = manager.create_session(user.id).await.unwrap();
        assert!(session.expires_at > OffsetDateTime::now_utc() + Duration::hours(23));

        let (resolved, _) = manager.resolve(&session.token).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn expired_session_is_treated_as_missing() {
        let (store, manager) = manager();
        let user = seed_user(&store).await;
        SessionStore::insert(
            &*store,
            NewSession {
                user_id: user.id,
                token: "stale".into(),
                expires_at: OffsetDateTime::now_utc() - Duration::hours(1),
            },
        )
        .await
        .unwrap();

        assert!(manager.resolve("stale").await.unwrap().is_none());
        assert!(manager.lookup("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn inactive_user_denied_by_resolve_but_not_lookup() {
        let (store, manager) = manager();
        let user = seed_user(&store).await;
        let session = manager.create_session(user.id).await.unwrap();
        store.set_account_flags(user.id, false, true);

        assert!(manager.resolve(&session.token).await.unwrap().is_none());
        assert!(manager.lookup(&session.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalidate_one_succeeds_for_unknown_token() {
        let (_, manager) = manager();
        manager.invalidate_one("never-issued").await.unwrap();
    }

    #[tokio::test]
    async fn invalidate_all_is_idempotent() {
        let (store, manager) = manager();
        let user = seed_user(&store).await;
        let session = manager.create_session(user.id).await.unwrap();

        manager.invalidate_all(user.id).await.unwrap();
        assert!(manager.resolve(&session.token).await.unwrap().is_none());
        // No sessions left; a second pass is still fine.
        manager.invalidate_all(user.id).await.unwrap();
    }
}
