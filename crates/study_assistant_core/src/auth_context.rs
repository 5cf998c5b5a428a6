//! crates/study_assistant_core/src/auth_context.rs
//!
//! Client-side session state: who is signed in, and whether the initial
//! session check is still pending. Consumers subscribe to changes through a
//! `watch` channel and use `route_guard` to decide redirects.

use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{info, warn};

use crate::domain::{AuthSession, AuthUser};
use crate::ports::{AuthProvider, PortError};

/// Snapshot of the session published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub loading: bool,
    pub user: Option<AuthUser>,
}

impl AuthState {
    fn pending() -> Self {
        Self {
            loading: true,
            user: None,
        }
    }
}

/// Result of a sign-in, sign-up or sign-out call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failed(String),
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success)
    }
}

/// The pages the auth guard knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Auth,
    Dashboard,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Auth => "/auth",
            Route::Dashboard => "/dashboard",
        }
    }
}

/// Where a consumer on `current` should be sent, if anywhere.
///
/// Nothing happens while the initial session check is pending.
pub fn route_guard(state: &AuthState, current: Route) -> Option<Route> {
    if state.loading {
        return None;
    }
    match (current, state.user.is_some()) {
        (Route::Dashboard, false) => Some(Route::Auth),
        (Route::Auth, true) => Some(Route::Dashboard),
        _ => None,
    }
}

pub struct AuthContext {
    provider: Arc<dyn AuthProvider>,
    token: RwLock<Option<String>>,
    state: watch::Sender<AuthState>,
}

impl AuthContext {
    /// Creates the context in the loading state. Call `init` to resolve the session.
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (state, _) = watch::channel(AuthState::pending());
        Self {
            provider,
            token: RwLock::new(None),
            state,
        }
    }

    /// Subscribes to session changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Resolves the user behind a previously stored token, if any, and clears `loading`.
    pub async fn init(&self, stored_token: Option<String>) {
        let user = match stored_token {
            Some(token) => match self.provider.current_user(&token).await {
                Ok(user) => {
                    *self.token.write().await = Some(token);
                    Some(user)
                }
                Err(PortError::Unauthorized) => None,
                Err(e) => {
                    warn!(error = %e, "Failed to resolve the stored session");
                    None
                }
            },
            None => None,
        };
        self.publish(user);
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthOutcome {
        let result = self.provider.sign_in(email, password).await;
        self.accept(result).await
    }

    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> AuthOutcome {
        let full_name = Some(full_name.trim()).filter(|n| !n.is_empty());
        let result = self.provider.sign_up(email, password, full_name).await;
        self.accept(result).await
    }

    /// Signs out with the provider and tears the session down locally either way.
    pub async fn sign_out(&self) -> AuthOutcome {
        let token = self.token.write().await.take();
        let outcome = match token {
            Some(token) => match self.provider.sign_out(&token).await {
                Ok(()) => AuthOutcome::Success,
                Err(e) => AuthOutcome::Failed(e.to_string()),
            },
            None => AuthOutcome::Success,
        };
        self.publish(None);
        outcome
    }

    /// Provider URL for the Google OAuth redirect flow.
    pub fn google_sign_in_url(&self, redirect_to: &str) -> String {
        self.provider.oauth_url("google", redirect_to)
    }

    async fn accept(&self, result: Result<AuthSession, PortError>) -> AuthOutcome {
        match result {
            Ok(session) => {
                info!(user_id = %session.user.id, "Signed in");
                *self.token.write().await = Some(session.access_token);
                self.publish(Some(session.user));
                AuthOutcome::Success
            }
            Err(e) => AuthOutcome::Failed(e.to_string()),
        }
    }

    fn publish(&self, user: Option<AuthUser>) {
        self.state.send_replace(AuthState {
            loading: false,
            user,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::ports::PortResult;

    struct FakeProvider {
        user: AuthUser,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                user: AuthUser {
                    id: Uuid::new_v4(),
                    email: "ada@example.com".into(),
                    full_name: Some("Ada".into()),
                },
            }
        }
    }

    #[async_trait]
    impl AuthProvider for FakeProvider {
        async fn sign_up(
            &self,
            email: &str,
            _password: &str,
            full_name: Option<&str>,
        ) -> PortResult<AuthSession> {
            Ok(AuthSession {
                access_token: "new-token".into(),
                user: AuthUser {
                    id: Uuid::new_v4(),
                    email: email.into(),
                    full_name: full_name.map(str::to_string),
                },
            })
        }

        async fn sign_in(&self, _email: &str, password: &str) -> PortResult<AuthSession> {
            if password != "secret" {
                return Err(PortError::Unauthorized);
            }
            Ok(AuthSession {
                access_token: "good-token".into(),
                user: self.user.clone(),
            })
        }

        async fn sign_out(&self, _access_token: &str) -> PortResult<()> {
            Ok(())
        }

        async fn current_user(&self, access_token: &str) -> PortResult<AuthUser> {
            if access_token == "good-token" {
                Ok(self.user.clone())
            } else {
                Err(PortError::Unauthorized)
            }
        }

        fn oauth_url(&self, provider: &str, redirect_to: &str) -> String {
            format!("https://auth.example.com/authorize?provider={provider}&redirect_to={redirect_to}")
        }
    }

    #[tokio::test]
    async fn starts_loading_then_resolves_stored_session() {
        let ctx = AuthContext::new(Arc::new(FakeProvider::new()));
        assert!(ctx.state().loading);
        assert_eq!(route_guard(&ctx.state(), Route::Dashboard), None);

        ctx.init(Some("good-token".into())).await;

        let state = ctx.state();
        assert!(!state.loading);
        assert_eq!(state.user.unwrap().email, "ada@example.com");
        assert_eq!(ctx.access_token().await.as_deref(), Some("good-token"));
    }

    #[tokio::test]
    async fn invalid_stored_token_means_signed_out() {
        let ctx = AuthContext::new(Arc::new(FakeProvider::new()));
        ctx.init(Some("expired".into())).await;

        assert_eq!(ctx.state().user, None);
        assert_eq!(route_guard(&ctx.state(), Route::Dashboard), Some(Route::Auth));
        assert_eq!(route_guard(&ctx.state(), Route::Auth), None);
    }

    #[tokio::test]
    async fn sign_in_publishes_user_and_sign_out_tears_down() {
        let ctx = AuthContext::new(Arc::new(FakeProvider::new()));
        let mut changes = ctx.subscribe();
        ctx.init(None).await;

        assert_eq!(
            ctx.sign_in("ada@example.com", "wrong").await,
            AuthOutcome::Failed("Unauthorized".into())
        );
        assert!(ctx.sign_in("ada@example.com", "secret").await.is_success());
        assert!(changes.has_changed().unwrap());
        assert!(changes.borrow_and_update().user.is_some());
        assert_eq!(route_guard(&ctx.state(), Route::Auth), Some(Route::Dashboard));

        assert!(ctx.sign_out().await.is_success());
        assert_eq!(ctx.state().user, None);
        assert_eq!(ctx.access_token().await, None);
    }

    #[tokio::test]
    async fn sign_up_passes_display_name() {
        let ctx = AuthContext::new(Arc::new(FakeProvider::new()));
        assert!(ctx.sign_up("grace@example.com", "pw", " Grace ").await.is_success());

        let user = ctx.state().user.unwrap();
        assert_eq!(user.email, "grace@example.com");
        assert_eq!(user.full_name.as_deref(), Some("Grace"));
    }

    #[test]
    fn google_url_comes_from_provider() {
        let ctx = AuthContext::new(Arc::new(FakeProvider::new()));
        assert!(ctx
            .google_sign_in_url("http://localhost:3000/dashboard")
            .contains("provider=google"));
    }
}
