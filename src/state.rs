use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::memory::MemoryStore;
use crate::auth::store::{SessionStore, UserStore};
use crate::config::{AppConfig, DEFAULT_SESSION_TTL_HOURS};
use crate::db::PgStore;

/// Shared application state: injected store capabilities plus config. The
/// stores are trait objects so an in-memory implementation can stand in for
/// Postgres in tests.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }

        let store = Arc::new(PgStore::new(pool));
        Ok(Self::from_parts(store.clone(), store, config))
    }

    pub fn from_parts(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            users,
            sessions,
            config,
        }
    }

    /// State backed by `MemoryStore`, for tests and local experimentation.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(
            store.clone(),
            store,
            Arc::new(AppConfig {
                database_url: "unused".into(),
                session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::service::AuthService;
    use axum::extract::FromRef;

    #[tokio::test]
    async fn in_memory_state_drives_the_auth_service() {
        let state = AppState::in_memory();
        let service = AuthService::from_ref(&state);

        let resp = service
            .signup("a@x.com", "pw123456", "A", "B")
            .await
            .unwrap();
        let me = service.current_user(&resp.token).await.unwrap().unwrap();
        assert_eq!(me.email, "a@x.com");
    }
}
