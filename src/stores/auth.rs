//! Session store
//!
//! Phases: `Anonymous -> Authenticating -> Authenticated`, falling back to
//! `Anonymous` when authentication fails. Only the `{user, isAuthenticated}`
//! snapshot is persisted (never loading/error), which lets
//! [`AuthStore::restore_session`] bring back the signed-in state without
//! sending credentials again.

use super::{Resettable, StoreStatus, Tracked, reject_locally, run_tracked};
use crate::api::{ApiClient, ApiResponse};
use crate::services;
use crate::storage::SessionStorage;
use crate::types::{
    AuthResponse, LoginRequest, MessageResponse, PasswordChange, ProfileUpdate, RegisterRequest,
    Result, SessionSnapshot, User,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPhase {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub phase: AuthPhase,
    pub user: Option<User>,
    pub status: StoreStatus,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated
    }

    pub fn loading(&self) -> bool {
        self.status.loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.status.error()
    }
}

fn acknowledge(_: &mut AuthState, response: ApiResponse<MessageResponse>) -> String {
    response.into_data().message
}

impl Tracked for AuthState {
    fn status(&self) -> &StoreStatus {
        &self.status
    }
    fn status_mut(&mut self) -> &mut StoreStatus {
        &mut self.status
    }
}

#[derive(Clone)]
pub struct AuthStore {
    client: ApiClient,
    state: Arc<RwLock<AuthState>>,
}

impl AuthStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(AuthState::default())),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AuthState {
        self.state.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    pub fn user(&self) -> Option<User> {
        self.state.read().user.clone()
    }

    pub(crate) fn resetter(&self) -> Arc<dyn Resettable> {
        self.state.clone()
    }

    fn storage(&self) -> &Arc<dyn SessionStorage> {
        self.client.storage()
    }

    // ============= Sign-in =============

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(reject_locally(&self.state, "Email and password are required"));
        }

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let client = self.client.clone();
        self.authenticate("login", async move {
            let response = services::auth::login(&client, &request).await?;
            Ok(response.into_data())
        })
        .await
    }

    pub async fn register(&self, email: &str, password: &str, name: Option<&str>) -> Result<User> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(reject_locally(&self.state, "Email and password are required"));
        }

        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            name: name.map(str::to_string).filter(|n| !n.trim().is_empty()),
        };
        let client = self.client.clone();
        self.authenticate("register", async move {
            let response = services::auth::register(&client, &request).await?;
            Ok(response.into_data())
        })
        .await
    }

    /// Shared tail of login/register: persist tokens, resolve the user,
    /// persist the snapshot
    async fn authenticate<F>(&self, action: &'static str, token_call: F) -> Result<User>
    where
        F: std::future::Future<Output = Result<AuthResponse>>,
    {
        self.state.write().phase = AuthPhase::Authenticating;

        let client = self.client.clone();
        let work = async move {
            let auth = token_call.await?;
            client
                .storage()
                .store_tokens(&auth.access_token, auth.refresh_token.as_deref())?;

            let user = match auth.user {
                Some(user) => user,
                None => services::auth::me(&client).await?.into_data(),
            };

            client.storage().store_session_snapshot(&SessionSnapshot {
                user: Some(user.clone()),
                is_authenticated: true,
            })?;
            Ok(user)
        };

        let result = run_tracked(&self.state, action, work, |s, user: User| {
            s.phase = AuthPhase::Authenticated;
            s.user = Some(user.clone());
            user
        })
        .await;

        match &result {
            Ok(user) => info!("Signed in as {}", user.email),
            Err(_) => {
                let mut s = self.state.write();
                s.phase = AuthPhase::Anonymous;
                s.user = None;
            }
        }
        result
    }

    /// Forget the session locally; there is no server-side logout
    pub fn logout(&self) -> Result<()> {
        let cleared = self.storage().clear_session();
        {
            let mut s = self.state.write();
            s.phase = AuthPhase::Anonymous;
            s.user = None;
            s.status.clear_error();
        }
        info!("Signed out");
        cleared
    }

    // ============= Session checks =============

    /// Restore the persisted snapshot without touching the network.
    /// Returns whether a signed-in session was restored.
    pub fn restore_session(&self) -> bool {
        if self.storage().access_token().is_none() {
            return false;
        }
        match self.storage().session_snapshot() {
            Some(SessionSnapshot {
                user: Some(user),
                is_authenticated: true,
            }) => {
                let mut s = self.state.write();
                s.phase = AuthPhase::Authenticated;
                s.user = Some(user);
                true
            }
            _ => false,
        }
    }

    /// Revalidate the stored token against `GET /auth/me`.
    ///
    /// - no token: `Ok(false)` without any network call
    /// - token rejected by the server: token and snapshot are cleared, `Ok(false)`
    /// - transport failure: `Err`, token kept for the next attempt
    pub async fn check_auth(&self) -> Result<bool> {
        if self.storage().access_token().is_none() {
            let mut s = self.state.write();
            s.phase = AuthPhase::Anonymous;
            s.user = None;
            return Ok(false);
        }

        let client = self.client.clone();
        let work = async move { Ok(services::auth::me(&client).await?.into_data()) };
        let result = run_tracked(&self.state, "check_auth", work, |s, user: User| {
            s.phase = AuthPhase::Authenticated;
            s.user = Some(user.clone());
            user
        })
        .await;

        match result {
            Ok(user) => {
                self.storage().store_session_snapshot(&SessionSnapshot {
                    user: Some(user),
                    is_authenticated: true,
                })?;
                Ok(true)
            }
            Err(err) => {
                {
                    let mut s = self.state.write();
                    s.phase = AuthPhase::Anonymous;
                    s.user = None;
                }
                if err.is_rejection() {
                    warn!("Stored token rejected: {}", err.user_message());
                    self.storage().clear_session()?;
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh_token(&self) -> Result<()> {
        let Some(refresh) = self.storage().refresh_token() else {
            return Err(reject_locally(&self.state, "No refresh token available"));
        };

        let client = self.client.clone();
        let work = async move {
            let auth = services::auth::refresh(&client, &refresh).await?.into_data();
            client
                .storage()
                .store_tokens(&auth.access_token, auth.refresh_token.as_deref())?;
            Ok(())
        };
        run_tracked(&self.state, "refresh_token", work, |_, ()| ()).await
    }

    // ============= Account =============

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User> {
        let client = self.client.clone();
        let work = async move {
            let user = services::settings::update_profile(&client, &update)
                .await?
                .into_data();
            client.storage().store_session_snapshot(&SessionSnapshot {
                user: Some(user.clone()),
                is_authenticated: true,
            })?;
            Ok(user)
        };
        run_tracked(&self.state, "update_profile", work, |s, user: User| {
            s.user = Some(user.clone());
            user
        })
        .await
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<String> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(reject_locally(&self.state, "Current and new password are required"));
        }
        let change = PasswordChange {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        let client = self.client.clone();
        let work = async move { services::settings::change_password(&client, &change).await };
        run_tracked(&self.state, "change_password", work, acknowledge).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        if email.trim().is_empty() {
            return Err(reject_locally(&self.state, "Email is required"));
        }
        let client = self.client.clone();
        let email = email.trim().to_string();
        let work = async move { services::auth::forgot_password(&client, &email).await };
        run_tracked(&self.state, "forgot_password", work, acknowledge).await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<String> {
        if token.is_empty() || password.is_empty() {
            return Err(reject_locally(&self.state, "Reset token and new password are required"));
        }
        let client = self.client.clone();
        let (token, password) = (token.to_string(), password.to_string());
        let work = async move { services::auth::reset_password(&client, &token, &password).await };
        run_tracked(&self.state, "reset_password", work, acknowledge).await
    }

    pub async fn verify_email(&self, token: &str) -> Result<String> {
        if token.is_empty() {
            return Err(reject_locally(&self.state, "Verification token is required"));
        }
        let client = self.client.clone();
        let token = token.to_string();
        let work = async move { services::auth::verify_email(&client, &token).await };
        run_tracked(&self.state, "verify_email", work, |s, r: ApiResponse<MessageResponse>| {
            if let Some(user) = s.user.as_mut() {
                user.is_verified = true;
            }
            r.into_data().message
        })
        .await
    }

    pub fn clear_error(&self) {
        self.state.write().status.clear_error();
    }
}
