use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::api::types::PermitDto;
use crate::constants::MAX_ATTACHMENTS;
use crate::db::NewPermit;
use crate::models::account::AccountRef;
use crate::models::permit::PermitStatus;
use crate::services::FinalDecision;

#[derive(Deserialize)]
pub struct FinalizeRequest {
    pub status: String,
}

/// POST /permit (multipart)
/// Creates a `Pending` permit owned by the authenticated requester. Accepts
/// up to 5 file attachments; files are stored opaquely, only their references
/// travel with the permit.
pub async fn submit_permit(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<PermitDto>>, ApiError> {
    let uploads_path = state.config().read().await.general.uploads_path.clone();

    let mut input = NewPermit::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "title" => input.title = read_text(field).await?,
            "work_description" => input.work_description = read_text(field).await?,
            "terminal" => input.terminal = read_text(field).await?,
            "window_start" => input.window_start = read_text(field).await?,
            "window_end" => input.window_end = read_text(field).await?,
            "risk_flags" => {
                let raw = read_text(field).await?;
                input.risk_flags = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "risk_reasons" => {
                let raw = read_text(field).await?;
                if !raw.is_empty() {
                    input.risk_reasons = Some(raw);
                }
            }
            "files" => {
                if input.attachments.len() >= MAX_ATTACHMENTS {
                    return Err(ApiError::validation(format!(
                        "At most {MAX_ATTACHMENTS} attachments are allowed"
                    )));
                }
                let reference = store_attachment(&uploads_path, field).await?;
                input.attachments.push(reference);
            }
            _ => {}
        }
    }

    let permit = state.permit_service().submit(current.id, input).await?;

    Ok(Json(ApiResponse::success(PermitDto::from(permit))))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map(|s| s.trim().to_string())
        .map_err(|e| ApiError::validation(format!("Unreadable field: {e}")))
}

async fn store_attachment(
    uploads_path: &str,
    field: axum::extract::multipart::Field<'_>,
) -> Result<String, ApiError> {
    let original = field.file_name().unwrap_or("attachment").to_string();
    let extension = std::path::Path::new(&original)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::validation(format!("Unreadable attachment: {e}")))?;

    let reference = format!("{}{extension}", uuid::Uuid::new_v4());
    let dest = std::path::Path::new(uploads_path).join(&reference);

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create uploads dir: {e}")))?;
    }
    tokio::fs::write(&dest, &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store attachment: {e}")))?;

    Ok(reference)
}

/// GET /permit
pub async fn list_permits(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
) -> Result<Json<ApiResponse<Vec<PermitDto>>>, ApiError> {
    let permits = state.permit_service().list_for_requester(current.id).await?;
    Ok(Json(ApiResponse::success(
        permits.into_iter().map(PermitDto::from).collect(),
    )))
}

/// GET /permit/{id}
pub async fn get_permit(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<PermitDto>>, ApiError> {
    let permit = state.permit_service().get_owned(id, current.id).await?;
    Ok(Json(ApiResponse::success(PermitDto::from(permit))))
}

/// PATCH /permit/{id}/status
/// Owner-side finalization of an `InProgress` permit. Approval mints the
/// permit number.
pub async fn finalize_permit(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
    Path(id): Path<i32>,
    Json(payload): Json<FinalizeRequest>,
) -> Result<Json<ApiResponse<PermitDto>>, ApiError> {
    let decision = match PermitStatus::parse(&payload.status.to_lowercase()) {
        Some(PermitStatus::Approved) => FinalDecision::Approve,
        Some(PermitStatus::Rejected) => FinalDecision::Reject,
        _ => {
            return Err(ApiError::validation(
                "status must be \"approved\" or \"rejected\"",
            ));
        }
    };

    let requester = state
        .store()
        .find_account_by_id(current.role, current.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load account: {e}")))?
        .ok_or(ApiError::NotAuthenticated)?;

    let permit = state
        .permit_service()
        .finalize(id, &requester, decision)
        .await?;

    Ok(Json(ApiResponse::success(PermitDto::from(permit))))
}

/// GET /permit/{id}/pdf
/// Streams the printable artifact. Only approved permits have one.
pub async fn permit_pdf(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let bytes = state.permit_service().render_pdf(id, current.id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"permit-{id}.pdf\""),
            ),
        ],
        bytes,
    )
        .into_response())
}
