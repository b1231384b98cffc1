use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState};
use crate::api::types::{AccountDto, LoginResponse, MessageResponse, ProfileResponse, SessionDto};
use crate::constants::SESSION_ACCOUNT_KEY;
use crate::models::account::{AccountRef, SessionMeta};
use crate::services::SessionCheck;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware run on every protected request. Checks that a
/// session exists, that the account behind it still exists, and that the
/// presented session is still the account's active one. A storage failure
/// during the check authorizes the request (fail open): availability is
/// preferred over strictness here, and the choice is explicit.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let current: Option<AccountRef> = session
        .get(SESSION_ACCOUNT_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;

    let Some(current) = current else {
        return Err(ApiError::NotAuthenticated);
    };
    let Some(session_id) = session.id() else {
        return Err(ApiError::NotAuthenticated);
    };

    match state
        .auth_service()
        .validate_session(&current, &session_id.to_string())
        .await
    {
        SessionCheck::Authorized(_) | SessionCheck::FailOpen => {
            tracing::Span::current().record("user_id", current.id);
            request.extensions_mut().insert(current);
            Ok(next.run(request).await)
        }
        SessionCheck::Gone => {
            let _ = session.flush().await;
            Err(ApiError::NotAuthenticated)
        }
        SessionCheck::Revoked => {
            let _ = session.flush().await;
            Err(ApiError::SessionRevoked)
        }
    }
}

/// Gate for reviewer routes (pre-approver subrole).
pub async fn require_pre_approver(
    Extension(current): Extension<AccountRef>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if current.role == crate::models::account::Role::PreApprover {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::AccessDenied)
    }
}

/// Gate for requester-owned routes.
pub async fn require_requester(
    Extension(current): Extension<AccountRef>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if current.role == crate::models::account::Role::Requester {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::AccessDenied)
    }
}

/// Gate for admin routes.
pub async fn require_admin(
    Extension(current): Extension<AccountRef>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if current.role == crate::models::account::Role::Admin {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::AccessDenied)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /login
/// Verifies credentials, then binds a fresh session as the account's sole
/// active one; any session from an earlier login is superseded.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let account = state
        .auth_service()
        .authenticate(&payload.email, &payload.password)
        .await?;

    // Drop whatever session rode in on the request before minting the new id.
    let _ = session.flush().await;

    let current = account.account_ref();
    session
        .insert(SESSION_ACCOUNT_KEY, current)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    session
        .save()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to persist session: {e}")))?;

    let session_id = session
        .id()
        .ok_or_else(|| ApiError::internal("Session id missing after save"))?;

    let meta = SessionMeta {
        user_agent: headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        ip: headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string()),
    };

    state
        .auth_service()
        .bind_session(&current, &session_id.to_string(), &meta)
        .await?;

    tracing::info!(account_id = current.id, role = %current.role, "Login");

    Ok(Json(ApiResponse::success(LoginResponse {
        user: AccountDto::from(account),
    })))
}

/// POST /logout
/// Destroys the transport session. Idempotent; the account's active-session
/// pointer is left alone, a dead id can never match a live one again.
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /profile
pub async fn profile(
    State(state): State<Arc<AppState>>,
    session: Session,
    Extension(current): Extension<AccountRef>,
) -> Result<Json<ApiResponse<ProfileResponse>>, ApiError> {
    let account = state
        .store()
        .find_account_by_id(current.role, current.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load account: {e}")))?
        .ok_or(ApiError::NotAuthenticated)?;

    let session_id = session.id().ok_or(ApiError::NotAuthenticated)?;

    Ok(Json(ApiResponse::success(ProfileResponse {
        user: AccountDto::from(account),
        session: SessionDto {
            id: session_id.to_string(),
            role: current.role.as_str().to_string(),
        },
    })))
}

/// POST /session/extend
/// Keep-alive issued by the idle monitor's "stay signed in" choice. Passing
/// the auth middleware already touched the session; nothing else to do.
pub async fn extend_session(
    Extension(_current): Extension<AccountRef>,
) -> Json<ApiResponse<MessageResponse>> {
    Json(ApiResponse::success(MessageResponse {
        message: "Session extended".to_string(),
    }))
}

/// POST /forgot-password
/// Always answers with the same generic message so the response cannot be
/// used to probe which emails have accounts.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    state
        .auth_service()
        .request_password_reset(&payload.email)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "If that email exists, a reset link has been sent".to_string(),
    })))
}

/// POST /reset-password
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if payload.token.is_empty() {
        return Err(ApiError::validation("Token is required"));
    }

    state
        .auth_service()
        .complete_password_reset(&payload.token, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}

/// PUT /update-password
/// Change password (requires current password verification)
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<AccountRef>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service()
        .change_password(&current, &payload.current_password, &payload.new_password)
        .await?;

    tracing::info!(account_id = current.id, "Password changed");

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}
