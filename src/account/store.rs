//! Credential store port.

use async_trait::async_trait;
use uuid::Uuid;

use super::Account;
use crate::error::Result;

/// Port for account credential persistence.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find an account by its ID.
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Account>>;

    /// Find an account by its email, case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Persist a new account.
    ///
    /// Fails with [`crate::error::ServerError::Conflict`] when the email
    /// is already taken.
    async fn create(&self, account: &Account) -> Result<()>;

    /// Replace the refresh token currently active for an account.
    async fn update_refresh_token(
        &self,
        id: &Uuid,
        refresh_token: &str,
    ) -> Result<()>;
}
