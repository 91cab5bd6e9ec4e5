use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::grant::{LoginCredentials, Registration, SessionGrant};
use super::principal::User;
use super::session::Session;
use crate::dispatch::{Dispatched, Dispatcher, NavigationEffect, ResponseEnvelope, Transport};
use crate::error::{AppError, AppResult};
use crate::tprintln;

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REGISTER_ENDPOINT: &str = "/auth/register";
pub const PROFILE_ENDPOINT: &str = "/auth/profile";

/// A failed auth call and the navigation the page should perform for it.
///
/// Refused credentials and invalid forms carry `NavigationEffect::None` so the
/// form stays up; server faults and unreachable APIs carry the error-page redirect.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthFailure {
    pub error: AppError,
    pub effect: NavigationEffect,
}

pub type AuthResult<T> = Result<T, AuthFailure>;

impl From<AppError> for AuthFailure {
    fn from(error: AppError) -> Self {
        Self { error, effect: NavigationEffect::None }
    }
}

impl AuthFailure {
    // Auth calls run without a session, so there is nothing to sign out.
    fn from_dispatch(out: Dispatched) -> Self {
        let effect = match out.effect {
            NavigationEffect::SignOut { .. } => NavigationEffect::None,
            other => other,
        };
        Self { error: out.envelope.to_error(), effect }
    }
}

/// Credential exchange with the records API.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Exchange credentials for a session. Rejections surface as `AppError::Auth`.
    async fn login(&self, creds: &LoginCredentials) -> AuthResult<Session>;
    async fn register(&self, form: &Registration) -> AuthResult<ResponseEnvelope>;
}

pub struct RemoteAuthProvider {
    transport: Arc<dyn Transport>,
}

impl RemoteAuthProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self { Self { transport } }

    fn anonymous(&self) -> Dispatcher<Option<Session>> {
        Dispatcher::new(self.transport.clone(), None)
    }

    /// Fetch the profile of the token's owner when the login body did not include it.
    async fn profile(&self, token: &str) -> AuthResult<User> {
        // Roles are unknown until the profile arrives; only the bearer header matters here.
        let pending = Session::new(User::new("pending", "pending@local", Default::default()), token);
        let out = Dispatcher::new(self.transport.clone(), Some(pending)).get(PROFILE_ENDPOINT, &[]).await;
        if !out.ok() {
            return Err(AuthFailure::from_dispatch(out));
        }
        let env = out.envelope;
        let user: AppResult<User> = match env.get("user") {
            Some(_) => env.decode_field("user"),
            None => env.decode(),
        };
        Ok(user?)
    }
}

#[async_trait]
impl AuthProvider for RemoteAuthProvider {
    async fn login(&self, creds: &LoginCredentials) -> AuthResult<Session> {
        creds.validate()?;
        let body = serde_json::to_value(creds).map_err(AppError::from)?;
        let out = self.anonymous().post(LOGIN_ENDPOINT, body).await;
        if !out.ok() {
            // Client-side statuses from the login endpoint mean the credentials were refused
            if matches!(out.status(), 400 | 401 | 403 | 404) {
                let message = out.envelope.message().unwrap_or_else(|| "Invalid email or password".to_string());
                return Err(AppError::auth("invalid_credentials".to_string(), message).into());
            }
            return Err(AuthFailure::from_dispatch(out));
        }
        let grant = SessionGrant::from_envelope(&out.envelope)?;
        let fallback = if grant.user.is_none() { Some(self.profile(&grant.access_token).await?) } else { None };
        let session = grant.into_session(fallback)?;
        info!(target: "session", user = %session.user.id, roles = %session.user.roles, "auth.login");
        tprintln!("auth.login email={} user={}", creds.email, session.user.id);
        Ok(session)
    }

    async fn register(&self, form: &Registration) -> AuthResult<ResponseEnvelope> {
        form.validate()?;
        let body = serde_json::to_value(form).map_err(AppError::from)?;
        let out = self.anonymous().post(REGISTER_ENDPOINT, body).await;
        if !out.ok() {
            return Err(AuthFailure::from_dispatch(out));
        }
        info!(target: "session", email = %form.email, "auth.register");
        Ok(out.envelope)
    }
}
