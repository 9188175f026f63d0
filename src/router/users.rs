//! Read-only account lookup.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::AppState;
use crate::account::Account;
use crate::error::{Result, ServerError};

fn invalid_id() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "id",
        ValidationError::new("invalid_id")
            .with_message("Account ID must be a UUID.".into()),
    );
    errors
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub user: Account,
}

/// Handler returning the public projection of an account.
pub async fn handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Response>> {
    let id = Uuid::parse_str(&id).map_err(|_| invalid_id())?;

    let Some(account) = state.store.find_by_id(&id).await? else {
        return Err(ServerError::NotFound);
    };

    Ok(Json(Response { user: account }))
}
