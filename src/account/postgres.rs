//! PostgreSQL implementation for the credential store.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::{PgPoolOptions, PgQueryResult};
use uuid::Uuid;

use super::{Account, CredentialStore};
use crate::error::{Result, ServerError};

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "folio";
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// PostgreSQL credential store.
#[derive(Clone)]
pub struct PgCredentialStore {
    pub pool: PgPool,
}

impl PgCredentialStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Init database connection pool.
    pub async fn connect(
        hostname: &str,
        username: &str,
        password: &str,
        db: &str,
        pool: u32,
    ) -> std::result::Result<Self, sqlx::Error> {
        let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
        let pool = PgPoolOptions::new().max_connections(pool);
        let postgres = pool.connect(&addr).await?;

        tracing::info!(%hostname, %db, "postgres connected");

        Ok(Self { pool: postgres })
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT
                id, email, first_name, last_name,
                password_hash, password_salt, refresh_token, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT
                id, email, first_name, last_name,
                password_hash, password_salt, refresh_token, created_at
            FROM accounts
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn create(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, email, first_name, last_name,
                password_hash, password_salt, refresh_token, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.password_hash)
        .bind(&account.password_salt)
        .bind(&account.refresh_token)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            // The unique index on lower(email) backs up the pre-insert
            // check; a concurrent duplicate surfaces here.
            if err
                .as_database_error()
                .is_some_and(|e| e.is_unique_violation())
            {
                ServerError::Conflict
            } else {
                ServerError::Sql(err)
            }
        })?;

        Ok(())
    }

    async fn update_refresh_token(
        &self,
        id: &Uuid,
        refresh_token: &str,
    ) -> Result<()> {
        let result: PgQueryResult = sqlx::query(
            r#"
            UPDATE accounts
            SET refresh_token = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(refresh_token)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound);
        }

        Ok(())
    }
}
