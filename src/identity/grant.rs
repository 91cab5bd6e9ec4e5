use serde::{Deserialize, Serialize};

use super::principal::{Gender, User};
use super::session::Session;
use crate::dispatch::ResponseEnvelope;
use crate::error::{AppError, AppResult};

/// Credentials posted to `/auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(AppError::user("password_required", "Password is required"));
        }
        Ok(())
    }
}

/// Body posted to `/auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
}

pub const MIN_PASSWORD_LEN: usize = 6;

impl Registration {
    pub fn validate(&self) -> AppResult<()> {
        if self.full_name.trim().is_empty() {
            return Err(AppError::user("full_name_required", "Full name is required"));
        }
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::user(
                "password_too_short".to_string(),
                format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }
        Ok(())
    }
}

fn validate_email(email: &str) -> AppResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    };
    if valid { Ok(()) } else { Err(AppError::user("invalid_email", "A valid email address is required")) }
}

/// What a successful credential exchange hands back, validated before it becomes a [`Session`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

impl SessionGrant {
    pub fn from_envelope(env: &ResponseEnvelope) -> AppResult<Self> {
        let grant: SessionGrant = env.decode()?;
        if grant.access_token.trim().is_empty() {
            return Err(AppError::upstream("empty_token", "Login response carried an empty access token"));
        }
        Ok(grant)
    }

    /// Pair the token with a user, taking the one embedded in the grant when present.
    pub fn into_session(self, fallback: Option<User>) -> AppResult<Session> {
        let user = self.user.or(fallback)
            .ok_or_else(|| AppError::upstream("missing_user", "Login response did not identify the user"))?;
        Ok(Session::new(user, self.access_token))
    }
}
