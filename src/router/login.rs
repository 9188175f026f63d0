use axum::Json;
use axum::extract::State;
use axum::http::{HeaderName, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::AppState;
use crate::account::Account;
use crate::error::{Result, ServerError};
use crate::router::{REFRESH_COOKIE, Valid};

#[derive(Debug, Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Body {
    #[validate(custom(
        function = "crate::router::validate_email",
        message = "Email must be formatted."
    ))]
    email: String,
    password: String,
}

/// Session payload, shared with the refresh route.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub user: Account,
    pub access_token: String,
}

/// Handler to open a session.
///
/// On success the refresh token becomes the only one accepted for this
/// account, revoking whichever cookie a previous login handed out.
pub async fn handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Valid(body): Valid<Body>,
) -> Result<(CookieJar, [(HeaderName, String); 1], Json<Response>)> {
    let email = body.email.to_lowercase();

    let Some(account) = state.store.find_by_email(&email).await? else {
        return Err(ServerError::NotFound);
    };

    if !state
        .hasher
        .verify_password(&body.password, &account.password_hash)
    {
        tracing::debug!(account_id = %account.id, "password mismatch");
        return Err(ServerError::Unauthorized);
    }

    let account_id = account.id.to_string();
    let access_token = state.token.create_access(&account_id)?;
    let refresh_token = state.token.create_refresh(&account_id)?;

    state
        .store
        .update_refresh_token(&account.id, &refresh_token)
        .await?;

    let cookie = Cookie::build((REFRESH_COOKIE, refresh_token))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(state.token.refresh_ttl() as i64))
        .build();

    tracing::info!(account_id = %account_id, "session opened");

    Ok((
        jar.add(cookie),
        [(header::AUTHORIZATION, access_token.clone())],
        Json(Response {
            user: account,
            access_token,
        }),
    ))
}
