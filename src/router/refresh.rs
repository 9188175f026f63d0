//! Get a new access token with the refresh cookie.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderName, header};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::REFRESH_COOKIE;
use crate::router::login::Response;

/// Handler to renew an access token.
///
/// The presented cookie must match the refresh token stored for the
/// account; a cookie replaced by a newer login no longer refreshes.
pub async fn handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<([(HeaderName, String); 1], Json<Response>)> {
    let Some(cookie) = jar.get(REFRESH_COOKIE) else {
        tracing::debug!("refresh without cookie");
        return Err(ServerError::Unauthorized);
    };
    let presented = cookie.value();

    let claims = state.token.decode(presented)?;
    let account_id =
        Uuid::parse_str(&claims.sub).map_err(|_| ServerError::Unauthorized)?;

    let Some(account) = state.store.find_by_id(&account_id).await? else {
        return Err(ServerError::NotFound);
    };

    if account.refresh_token.as_deref() != Some(presented) {
        tracing::debug!(account_id = %account.id, "stale refresh token presented");
        return Err(ServerError::Unauthorized);
    }

    let access_token = state.token.create_access(&claims.sub)?;

    Ok((
        [(header::AUTHORIZATION, access_token.clone())],
        Json(Response {
            user: account,
            access_token,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::json;

    use super::*;
    use crate::router::login::tests::{login, refresh_cookie, register};
    use crate::*;

    fn cookie_header(token: &str) -> String {
        format!("{REFRESH_COOKIE}={token}")
    }

    #[tokio::test]
    async fn test_refresh_handler() {
        let state = router::state();
        let app = app(state.clone());

        register(app.clone()).await;
        let response = login(app.clone()).await;
        let presented = refresh_cookie(&response);

        let login_body =
            response.into_body().collect().await.unwrap().to_bytes();
        let login_body: Response =
            serde_json::from_slice(&login_body).unwrap();

        let response = make_request_with_cookie(
            app,
            Method::POST,
            "/refresh",
            &cookie_header(&presented),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        // The refresh cookie itself is not reissued.
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let header_token = response
            .headers()
            .get(header::AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_owned();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Response = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.access_token, header_token);
        assert_eq!(body.user.id, login_body.user.id);
        assert_ne!(body.access_token, login_body.access_token);

        let claims = state.token.decode(&body.access_token).unwrap();
        assert_eq!(claims.sub, body.user.id.to_string());
    }

    #[tokio::test]
    async fn test_refresh_without_cookie() {
        let state = router::state();
        let app = app(state);

        let response = make_request(
            app,
            Method::POST,
            "/refresh",
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_with_garbage_cookie() {
        let state = router::state();
        let app = app(state);

        let response = make_request_with_cookie(
            app,
            Method::POST,
            "/refresh",
            &cookie_header("nonsense"),
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_with_rotated_cookie() {
        let state = router::state();
        let app = app(state);

        register(app.clone()).await;
        let first = refresh_cookie(&login(app.clone()).await);
        let second = refresh_cookie(&login(app.clone()).await);

        // The older cookie was revoked by the second login.
        let response = make_request_with_cookie(
            app.clone(),
            Method::POST,
            "/refresh",
            &cookie_header(&first),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = make_request_with_cookie(
            app,
            Method::POST,
            "/refresh",
            &cookie_header(&second),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let state = router::state();
        let app = app(state);

        register(app.clone()).await;
        let response = login(app.clone()).await;

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Response = serde_json::from_slice(&body).unwrap();

        // A valid access token is still not the stored refresh token.
        let response = make_request_with_cookie(
            app,
            Method::POST,
            "/refresh",
            &cookie_header(&body.access_token),
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_unknown_account() {
        let state = router::state();
        let app = app(state.clone());

        // Properly signed refresh token for an account that was never
        // created.
        let token = state
            .token
            .create_refresh(&uuid::Uuid::new_v4().to_string())
            .unwrap();

        let response = make_request_with_cookie(
            app,
            Method::POST,
            "/refresh",
            &cookie_header(&token),
            String::default(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_full_session_scenario() {
        let state = router::state();
        let app = app(state);

        // Register, log in, refresh with the handed-out cookie, then a
        // wrong password attempt.
        let response = make_request(
            app.clone(),
            Method::POST,
            "/register",
            json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "a@b.com",
                "password": "secret1",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/login",
            json!({ "email": "a@b.com", "password": "secret1" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let presented = refresh_cookie(&response);

        let response = make_request_with_cookie(
            app.clone(),
            Method::POST,
            "/refresh",
            &cookie_header(&presented),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Response = serde_json::from_slice(&body).unwrap();
        assert!(!body.access_token.is_empty());

        let response = make_request(
            app,
            Method::POST,
            "/login",
            json!({ "email": "a@b.com", "password": "wrong-password" })
                .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
