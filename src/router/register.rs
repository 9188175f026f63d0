use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::AppState;
use crate::account::Account;
use crate::error::{Result, ServerError};
use crate::router::ValidWithState;

#[derive(Debug, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
#[validate(context = AppState)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Body {
    #[validate(length(min = 1, message = "First name must not be empty."))]
    first_name: String,
    #[validate(length(min = 1, message = "Last name must not be empty."))]
    last_name: String,
    #[validate(custom(
        function = "crate::router::validate_email",
        message = "Email must be formatted."
    ))]
    email: String,
    #[validate(custom(
        function = "crate::router::validate_password",
        message = "Password is too short.",
        use_context
    ))]
    password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Handler to register an account.
///
/// Registration never opens a session; the client logs in afterwards.
pub async fn handler(
    State(state): State<AppState>,
    ValidWithState(body): ValidWithState<Body>,
) -> Result<(StatusCode, Json<Response>)> {
    let email = body.email.to_lowercase();

    if state.store.find_by_email(&email).await?.is_some() {
        return Err(ServerError::Conflict);
    }

    let salt = state.hasher.generate_salt();
    let password_hash = state.hasher.derive(&salt, &body.password)?;

    let account = Account {
        id: Uuid::new_v4(),
        email,
        first_name: body.first_name.clone(),
        last_name: body.last_name.clone(),
        password_hash,
        password_salt: salt,
        refresh_token: None,
        created_at: Utc::now(),
    };
    state.store.create(&account).await?;

    tracing::info!(account_id = %account.id, "account registered");

    Ok((
        StatusCode::CREATED,
        Json(Response {
            first_name: account.first_name,
            last_name: account.last_name,
            email: account.email,
        }),
    ))
}
