use axum::{Json, extract::State};
use garde::Validate;
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::response::ApiResponse;
use crate::handlers::validate_request;
use crate::services::password_reset::{ResetCompleted, ResetRequested};
use crate::state::AppState;

// === リセットリクエスト ===

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[garde(length(min = 1), contains("@"))]
    pub email: String,
}

/// POST /api/v1/auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<ResetRequested>>, AppError> {
    validate_request(&request)?;

    let result = state
        .password_reset_service
        .request_reset(request.email.trim())
        .await?;

    Ok(Json(ApiResponse::success(result.message.clone(), result)))
}

// === パスワードリセット実行 ===

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[garde(length(min = 1))]
    pub token: String,
    #[garde(length(min = 8), custom(password_strength))]
    pub new_password: String,
    #[garde(matches(new_password))]
    pub confirm_password: String,
}

/// POST /api/v1/auth/reset-password
///
/// # Security
/// - token, new_password はログに出力しない
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<ResetCompleted>>, AppError> {
    validate_request(&request)?;

    let result = state
        .password_reset_service
        .reset_password(request.token.trim(), &request.new_password)
        .await?;

    Ok(Json(ApiResponse::success(result.message.clone(), result)))
}

/// 大文字と数字を最低1文字ずつ含むこと
fn password_strength(value: &str, _context: &()) -> garde::Result {
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(garde::Error::new("大文字を1文字以上含めてください"));
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(garde::Error::new("数字を1文字以上含めてください"));
    }
    Ok(())
}
