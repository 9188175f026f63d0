//! In-memory credential store.
//!
//! Backs the test suite and development runs without a configured
//! database. The map lock is never held across an await point.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use super::{Account, CredentialStore};
use crate::error::{Result, ServerError};

#[derive(Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> ServerError {
    ServerError::Internal {
        details: "account store lock poisoned".into(),
        source: None,
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Account>> {
        let accounts = self.accounts.read().map_err(poisoned)?;

        Ok(accounts.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().map_err(poisoned)?;

        Ok(accounts
            .values()
            .find(|account| account.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;

        if accounts
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(ServerError::Conflict);
        }

        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_refresh_token(
        &self,
        id: &Uuid,
        refresh_token: &str,
    ) -> Result<()> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;

        match accounts.get_mut(id) {
            Some(account) => {
                account.refresh_token = Some(refresh_token.to_owned());
                Ok(())
            },
            None => Err(ServerError::NotFound),
        }
    }
}
