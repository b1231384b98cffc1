use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::api::types::{MessageResponse, NotificationDto, UnreadCountResponse};
use crate::models::account::AccountRef;

/// GET /notifications
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
) -> Result<Json<ApiResponse<Vec<NotificationDto>>>, ApiError> {
    let notifications = state
        .notification_service()
        .list_for_user(current.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list notifications: {e}")))?;

    Ok(Json(ApiResponse::success(
        notifications.into_iter().map(NotificationDto::from).collect(),
    )))
}

/// GET /notifications/unread-count
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
) -> Result<Json<ApiResponse<UnreadCountResponse>>, ApiError> {
    let unread = state
        .notification_service()
        .unread_count(current.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to count notifications: {e}")))?;

    Ok(Json(ApiResponse::success(UnreadCountResponse { unread })))
}

/// POST /notifications/read-all
/// Read-sweep; records stay, only the flags flip.
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let updated = state
        .notification_service()
        .mark_all_read(current.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to mark notifications: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("{updated} notifications marked read"),
    })))
}
