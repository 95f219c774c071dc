use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, warn};

use crate::auth::dto::{AuthResponse, PublicUser};
use crate::auth::error::AuthError;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::SessionManager;
use crate::auth::store::{NewUser, ProfileChanges, UserStore};
use crate::state::AppState;

/// Stateful auth workflows. Each is a linear pipeline with early-exit
/// failures; none partially commits.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), SessionManager::from_ref(state))
    }
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: SessionManager) -> Self {
        Self { users, sessions }
    }

    /// Creates the account (role `user`, active, unverified) and its first
    /// session. A session insert failure after the user insert surfaces as a
    /// store error rather than being swallowed.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<AuthResponse, AuthError> {
        if self.users.find_by_email(email).await?.is_some() {
            warn!(email, "signup with existing email");
            return Err(AuthError::EmailExists);
        }

        let password_hash = hash_password(password).map_err(AuthError::Internal)?;
        let user = self
            .users
            .insert(NewUser {
                email: email.to_string(),
                password_hash,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            })
            .await?;

        let session = self.sessions.create_session(user.id).await?;

        info!(user_id = user.id, email = %user.email, "user signed up");
        Ok(AuthResponse {
            user: PublicUser::from(&user),
            token: session.token,
        })
    }

    /// Prior sessions are kept; each login issues an independent token.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            // Same error as a wrong password; see AuthError::InvalidCredentials.
            warn!(email, "login with unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let ok = verify_password(password, &user.password_hash).map_err(AuthError::Internal)?;
        if !ok {
            warn!(user_id = user.id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = user.id, "login to deactivated account");
            return Err(AuthError::AccountDeactivated);
        }
        if !user.email_verified {
            warn!(user_id = user.id, "login to unverified account");
            return Err(AuthError::EmailNotVerified);
        }

        let session = self.sessions.create_session(user.id).await?;

        info!(user_id = user.id, "user logged in");
        Ok(AuthResponse {
            user: PublicUser::from(&user),
            token: session.token,
        })
    }

    /// Always succeeds, whether or not the token matched a session. Only a
    /// store failure during the delete is an error.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.invalidate_one(token).await?;
        Ok(())
    }

    /// Query, not a gate: missing, expired, or deactivated all yield `None`.
    pub async fn current_user(&self, token: &str) -> Result<Option<PublicUser>, AuthError> {
        let resolved = self.sessions.resolve(token).await?;
        Ok(resolved.map(|(user, _)| PublicUser::from(&user)))
    }

    /// Rotates the credential and destroys every session of the user,
    /// including the one authenticating this call. The caller must log in
    /// again afterwards.
    pub async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let Some((user, _)) = self.sessions.lookup(token).await? else {
            return Err(AuthError::InvalidOrExpiredToken);
        };

        let ok = verify_password(current_password, &user.password_hash)
            .map_err(AuthError::Internal)?;
        if !ok {
            warn!(user_id = user.id, "password change with wrong current password");
            return Err(AuthError::IncorrectCurrentPassword);
        }

        let new_hash = hash_password(new_password).map_err(AuthError::Internal)?;
        self.users.rotate_password(user.id, &new_hash).await?;

        info!(user_id = user.id, "password changed, all sessions revoked");
        Ok(())
    }

    /// Applies only the supplied fields; `updated_at` is bumped either way.
    pub async fn update_profile(
        &self,
        token: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<PublicUser, AuthError> {
        let Some((user, _)) = self.sessions.lookup(token).await? else {
            return Err(AuthError::InvalidOrExpiredToken);
        };

        let updated = self
            .users
            .update_profile(
                user.id,
                ProfileChanges {
                    first_name,
                    last_name,
                },
            )
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(user_id = updated.id, "profile updated");
        Ok(PublicUser::from(&updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryStore;
    use crate::auth::store::{NewSession, SessionStore};
    use time::{Duration, OffsetDateTime};

    fn service() -> (Arc<MemoryStore>, AuthService) {
        let store = Arc::new(MemoryStore::new());
        let sessions = SessionManager::new(store.clone(), store.clone(), 24);
        (store.clone(), AuthService::new(store, sessions))
    }

    async fn signup(svc: &AuthService, email: &str, password: &str) -> AuthResponse {
        svc.signup(email, password, "A", "B").await.unwrap()
    }

    #[tokio::test]
    async fn signup_token_resolves_to_new_user() {
        let (_, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;

        let me = svc.current_user(&resp.token).await.unwrap().unwrap();
        assert_eq!(me.email, "a@x.com");
        assert_eq!(me.id, resp.user.id);
        assert!(!me.email_verified);
        assert!(me.is_active);
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email() {
        let (store, svc) = service();
        let first = signup(&svc, "a@x.com", "pw123456").await;

        let err = svc.signup("a@x.com", "other-pw1", "C", "D").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailExists));

        // No second row was created.
        let existing = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(existing.id, first.user.id);
    }

    #[tokio::test]
    async fn login_merges_unknown_email_and_wrong_password() {
        let (store, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;
        store.set_account_flags(resp.user.id, true, true);

        let unknown = svc.login("nobody@x.com", "pw123456").await.unwrap_err();
        let wrong = svc.login("a@x.com", "bad-password").await.unwrap_err();
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn login_rejects_deactivated_account_despite_correct_password() {
        let (store, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;
        store.set_account_flags(resp.user.id, false, true);

        let err = svc.login("a@x.com", "pw123456").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDeactivated));
    }

    #[tokio::test]
    async fn login_rejects_unverified_email_despite_correct_password() {
        let (_, svc) = service();
        signup(&svc, "a@x.com", "pw123456").await;

        let err = svc.login("a@x.com", "pw123456").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailNotVerified));
    }

    #[tokio::test]
    async fn two_logins_issue_independent_tokens() {
        let (store, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;
        store.set_account_flags(resp.user.id, true, true);

        let first = svc.login("a@x.com", "pw123456").await.unwrap();
        let second = svc.login("a@x.com", "pw123456").await.unwrap();
        assert_ne!(first.token, second.token);
        assert!(svc.current_user(&first.token).await.unwrap().is_some());
        assert!(svc.current_user(&second.token).await.unwrap().is_some());

        // Revoking one leaves the other alone.
        svc.logout(&first.token).await.unwrap();
        assert!(svc.current_user(&first.token).await.unwrap().is_none());
        assert!(svc.current_user(&second.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn logout_succeeds_for_unknown_and_expired_tokens() {
        let (store, svc) = service();
        svc.logout("never-issued").await.unwrap();

        SessionStore::insert(
            &*store,
            NewSession {
                user_id: 1,
                token: "stale".into(),
                expires_at: OffsetDateTime::now_utc() - Duration::minutes(5),
            },
        )
        .await
        .unwrap();
        svc.logout("stale").await.unwrap();
        svc.logout("stale").await.unwrap();
    }

    #[tokio::test]
    async fn current_user_returns_none_for_expired_session() {
        let (store, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;
        SessionStore::insert(
            &*store,
            NewSession {
                user_id: resp.user.id,
                token: "stale".into(),
                expires_at: OffsetDateTime::now_utc() - Duration::hours(1),
            },
        )
        .await
        .unwrap();

        assert!(svc.current_user("stale").await.unwrap().is_none());
        let err = svc
            .change_password("stale", "pw123456", "newpw123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
        let err = svc
            .update_profile("stale", Some("X".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn change_password_rejects_wrong_current_password() {
        let (_, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;

        let err = svc
            .change_password(&resp.token, "not-the-password", "newpw123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::IncorrectCurrentPassword));
        // The session survives a failed attempt.
        assert!(svc.current_user(&resp.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn change_password_rotates_credential_and_revokes_all_sessions() {
        let (store, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;
        store.set_account_flags(resp.user.id, true, true);
        let other = svc.login("a@x.com", "pw123456").await.unwrap();

        svc.change_password(&resp.token, "pw123456", "newpw123")
            .await
            .unwrap();

        // Every prior token is dead, including the authenticating one.
        assert!(svc.current_user(&resp.token).await.unwrap().is_none());
        assert!(svc.current_user(&other.token).await.unwrap().is_none());

        // Old password no longer verifies; the new one does.
        let err = svc.login("a@x.com", "pw123456").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(svc.login("a@x.com", "newpw123").await.is_ok());
    }

    #[tokio::test]
    async fn change_password_preserves_verification_state() {
        // Full scenario: signup, change password through the signup token,
        // then the unverified account still cannot log in.
        let (_, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;

        let me = svc.current_user(&resp.token).await.unwrap().unwrap();
        assert!(!me.email_verified);

        svc.change_password(&resp.token, "pw123456", "newpw123")
            .await
            .unwrap();
        assert!(svc.current_user(&resp.token).await.unwrap().is_none());

        let err = svc.login("a@x.com", "newpw123").await.unwrap_err();
        assert!(matches!(err, AuthError::EmailNotVerified));
    }

    #[tokio::test]
    async fn deactivated_account_may_still_change_password() {
        let (store, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;
        store.set_account_flags(resp.user.id, false, false);

        svc.change_password(&resp.token, "pw123456", "newpw123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_profile_applies_only_present_fields() {
        let (_, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;

        let updated = svc
            .update_profile(&resp.token, Some("Alice".into()), None)
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Alice");
        assert_eq!(updated.last_name, "B");
        assert!(updated.updated_at >= resp.user.updated_at);
    }

    #[tokio::test]
    async fn update_profile_with_no_fields_still_bumps_updated_at() {
        let (_, svc) = service();
        let resp = signup(&svc, "a@x.com", "pw123456").await;

        let updated = svc.update_profile(&resp.token, None, None).await.unwrap();
        assert_eq!(updated.first_name, "A");
        assert!(updated.updated_at >= resp.user.updated_at);
    }
}
