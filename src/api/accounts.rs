use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::task;

use super::{ApiError, ApiResponse, AppState};
use crate::api::types::AccountDto;
use crate::db::repositories::account::hash_password;
use crate::models::account::{AccountStatus, Role};

#[derive(Deserialize)]
pub struct CreateAccountRequest {
    pub role: String,
    pub email: String,
    pub display_name: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

/// GET /accounts
/// All accounts across the three collections, role tagged.
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<AccountDto>>>, ApiError> {
    let accounts = state
        .store()
        .list_accounts()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list accounts: {e}")))?;

    Ok(Json(ApiResponse::success(
        accounts.into_iter().map(AccountDto::from).collect(),
    )))
}

/// POST /accounts
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateAccountRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let role = Role::parse(&payload.role)
        .ok_or_else(|| ApiError::validation("Unknown role"))?;

    if payload.email.trim().is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.display_name.trim().is_empty() {
        return Err(ApiError::validation("Display name is required"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }

    if state
        .store()
        .account_email_in_use(&payload.email)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to check email: {e}")))?
    {
        return Err(ApiError::validation("Email is already in use"));
    }

    let security = state.config().read().await.security.clone();
    let password = payload.password.clone();
    let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&security)))
        .await
        .map_err(|e| ApiError::internal(format!("Password hashing task panicked: {e}")))?
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;

    let account = state
        .store()
        .create_account(role, &payload.email, &payload.display_name, &password_hash)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create account: {e}")))?;

    tracing::info!(account_id = account.id, role = %account.role, "Account created");

    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}

/// PUT /accounts/{role}/{id}/status
/// Active|Inactive toggle; inactive accounts are refused at login.
pub async fn set_account_status(
    State(state): State<Arc<AppState>>,
    Path((role, id)): Path<(String, i32)>,
    Json(payload): Json<SetStatusRequest>,
) -> Result<Json<ApiResponse<AccountDto>>, ApiError> {
    let role = Role::parse(&role).ok_or_else(|| ApiError::validation("Unknown role"))?;
    let status = AccountStatus::parse(&payload.status)
        .ok_or_else(|| ApiError::validation("status must be \"active\" or \"inactive\""))?;

    let changed = state
        .store()
        .set_account_status(role, id, status)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update status: {e}")))?;

    if !changed {
        return Err(ApiError::not_found("Account", id));
    }

    let account = state
        .store()
        .find_account_by_id(role, id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load account: {e}")))?
        .ok_or_else(|| ApiError::not_found("Account", id))?;

    Ok(Json(ApiResponse::success(AccountDto::from(account))))
}
