//! Manage json web tokens.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Token as TokenConfig;
use crate::error::{Result, ServerError};

const DEFAULT_ACCESS_TTL: u64 = 60 * 60; // 1 hour.
const DEFAULT_REFRESH_TTL: u64 = 60 * 60 * 24; // 1 day.

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// Unique token identifier. Keeps two tokens issued within the same
    /// second distinct.
    pub jti: String,
    /// Account ID.
    pub sub: String,
}

/// Manage JWT tokens.
///
/// Both token kinds share the same HMAC secret; they differ only in
/// lifetime.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: u64,
    refresh_ttl: u64,
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance.
    ///
    /// Fails when the signing secret is empty so the server refuses to
    /// start without one.
    pub fn new(
        issuer: &str,
        secret: &str,
        config: Option<TokenConfig>,
    ) -> Result<Self> {
        if secret.trim().is_empty() {
            return Err(ServerError::Config(
                "token signing secret must not be empty".into(),
            ));
        }

        let config = config.unwrap_or_default();

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_owned(),
            access_ttl: config.access_ttl_secs.unwrap_or(DEFAULT_ACCESS_TTL),
            refresh_ttl: config.refresh_ttl_secs.unwrap_or(DEFAULT_REFRESH_TTL),
        })
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl(&self) -> u64 {
        self.access_ttl
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl(&self) -> u64 {
        self.refresh_ttl
    }

    fn create(&self, account_id: &str, ttl: u64) -> Result<String> {
        let now = Utc::now().timestamp() as u64;
        let header = Header::new(self.algorithm);
        let claims = Claims {
            exp: now + ttl,
            iat: now,
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
            sub: account_id.to_owned(),
        };

        encode(&header, &claims, &self.encoding_key).map_err(|err| {
            ServerError::Internal {
                details: "failed to sign token".into(),
                source: Some(Box::new(err)),
            }
        })
    }

    /// Create a short-lived access token.
    pub fn create_access(&self, account_id: &str) -> Result<String> {
        self.create(account_id, self.access_ttl)
    }

    /// Create a long-lived refresh token.
    pub fn create_refresh(&self, account_id: &str) -> Result<String> {
        self.create(account_id, self.refresh_ttl)
    }

    /// Decode and check a token.
    ///
    /// Expired and tampered tokens both come back as [`ServerError::Unauthorized`];
    /// the distinction only shows up in logs.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| {
                match err.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("token expired");
                    },
                    kind => {
                        tracing::debug!(?kind, "token rejected");
                    },
                }

                ServerError::Unauthorized
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUER: &str = "https://folio.example.com/";
    const SECRET: &str = "unit-test-secret";

    fn manager() -> TokenManager {
        TokenManager::new(ISSUER, SECRET, None).unwrap()
    }

    #[test]
    fn test_empty_secret_is_fatal() {
        assert!(matches!(
            TokenManager::new(ISSUER, "", None),
            Err(ServerError::Config(_))
        ));
        assert!(matches!(
            TokenManager::new(ISSUER, "   ", None),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn test_access_token_round_trip() {
        let token = manager();
        let encoded = token.create_access("8df097b0").unwrap();

        let claims = token.decode(&encoded).unwrap();
        assert_eq!(claims.sub, "8df097b0");
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, DEFAULT_ACCESS_TTL);
    }

    #[test]
    fn test_refresh_token_lives_longer() {
        let token = manager();
        let encoded = token.create_refresh("8df097b0").unwrap();

        let claims = token.decode(&encoded).unwrap();
        assert_eq!(claims.exp - claims.iat, DEFAULT_REFRESH_TTL);
    }

    #[test]
    fn test_tokens_are_unique() {
        let token = manager();

        // Same subject and second must still produce distinct tokens,
        // otherwise rotation could not revoke the previous one.
        let first = token.create_refresh("8df097b0").unwrap();
        let second = token.create_refresh("8df097b0").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let token = manager();

        assert!(matches!(
            token.decode("not.a.token"),
            Err(ServerError::Unauthorized)
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_secret() {
        let token = manager();
        let other =
            TokenManager::new(ISSUER, "another-secret", None).unwrap();

        let encoded = other.create_access("8df097b0").unwrap();
        assert!(matches!(
            token.decode(&encoded),
            Err(ServerError::Unauthorized)
        ));
    }

    #[test]
    fn test_decode_rejects_expired() {
        let token = manager();

        // Issued two hours ago, expired one hour ago. Well past any
        // validation leeway.
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            exp: now - 3600,
            iat: now - 7200,
            iss: ISSUER.to_owned(),
            jti: "expired".to_owned(),
            sub: "8df097b0".to_owned(),
        };
        let encoded = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            token.decode(&encoded),
            Err(ServerError::Unauthorized)
        ));
    }
}
