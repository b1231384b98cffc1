use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::api::types::PermitDto;
use crate::models::account::AccountRef;

#[derive(Deserialize, Default)]
pub struct ReviewRequest {
    pub comments: Option<String>,
}

/// GET /permits
/// Queue of permits awaiting pre-review.
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PermitDto>>>, ApiError> {
    let permits = state.permit_service().list_pending().await?;
    Ok(Json(ApiResponse::success(
        permits.into_iter().map(PermitDto::from).collect(),
    )))
}

/// POST /approve/{id}
/// Pre-approval: moves a `Pending` permit to `InProgress` and notifies the
/// requester.
pub async fn approve(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
    Path(id): Path<i32>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<PermitDto>>, ApiError> {
    let actor = load_actor(&state, current).await?;

    let permit = state
        .permit_service()
        .pre_approve(id, &actor, payload.comments)
        .await?;

    Ok(Json(ApiResponse::success(PermitDto::from(permit))))
}

/// POST /reject/{id}
/// Pre-rejection: terminal `Rejected` straight from `Pending`.
pub async fn reject(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
    Path(id): Path<i32>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<PermitDto>>, ApiError> {
    let actor = load_actor(&state, current).await?;

    let permit = state
        .permit_service()
        .pre_reject(id, &actor, payload.comments)
        .await?;

    Ok(Json(ApiResponse::success(PermitDto::from(permit))))
}

async fn load_actor(
    state: &Arc<AppState>,
    current: AccountRef,
) -> Result<crate::models::account::Account, ApiError> {
    state
        .store()
        .find_account_by_id(current.role, current.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load account: {e}")))?
        .ok_or(ApiError::NotAuthenticated)
}
