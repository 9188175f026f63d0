//! HTTP surface of the credential API.

pub mod health;
pub mod login;
pub mod refresh;
pub mod register;
pub mod users;

use axum::Json;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidateArgs, ValidationError};

use crate::AppState;
use crate::error::{ResponseError, ServerError};

/// Name of the cookie carrying the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

/// JSON extractor running stateless validation rules.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;

        Ok(Self(data))
    }
}

/// JSON extractor running validation rules that need the application
/// state, such as the configured password policy.
pub struct ValidWithState<T>(pub T);

impl<T> FromRequest<AppState> for ValidWithState<T>
where
    T: DeserializeOwned + for<'a> ValidateArgs<'a, Args = &'a AppState>,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate_with_args(state)?;

        Ok(Self(data))
    }
}

/// Minimal email rule: long enough to be plausible and carrying an `@`.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() < 6 || !email.contains('@') {
        return Err(ValidationError::new("invalid_email"));
    }

    Ok(())
}

/// Password length policy, read from configuration.
pub fn validate_password(
    password: &str,
    state: &AppState,
) -> Result<(), ValidationError> {
    if (password.chars().count() as u64) < state.config.password_min_length()
    {
        return Err(ValidationError::new("password_too_short"));
    }

    Ok(())
}

/// Fallback for unknown routes, keeping the JSON error envelope.
pub async fn unknown_route() -> axum::response::Response {
    use axum::response::IntoResponse;

    ResponseError::default()
        .title("Route not found.")
        .status(StatusCode::NOT_FOUND)
        .into_response()
        .unwrap_or_else(|_| StatusCode::NOT_FOUND.into_response())
}

/// Application state over the in-memory store, cheap hashing parameters
/// and a fixed signing secret.
#[cfg(test)]
pub(crate) fn state() -> AppState {
    use std::sync::Arc;

    use crate::account::MemoryCredentialStore;
    use crate::config::{Argon2, Configuration};
    use crate::crypto::PasswordManager;
    use crate::token::TokenManager;

    let mut config = Configuration::default();
    config.url = "https://folio.example.com/".to_owned();
    let config = Arc::new(config);

    let hasher = PasswordManager::new(Some(Argon2 {
        memory_cost: 1024,
        iterations: 1,
        parallelism: 1,
        hash_length: 32,
    }))
    .expect("argon2 parameters are valid");

    let token = TokenManager::new(&config.url, "router-test-secret", None)
        .expect("cannot create token manager");

    AppState {
        config,
        store: Arc::new(MemoryCredentialStore::new()),
        hasher: Arc::new(hasher),
        token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("ab.com").is_err());
        assert!(validate_email("a@b.c").is_err()); // too short.
    }

    #[test]
    fn test_validate_password_uses_config() {
        let state = state();

        assert!(validate_password("secret1", &state).is_ok());
        assert!(validate_password("secret", &state).is_ok());
        assert!(validate_password("pass", &state).is_err());
    }
}
