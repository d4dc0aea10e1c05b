use axum::{Json, extract::State, http::StatusCode};
use garde::Validate;
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::response::ApiResponse;
use crate::handlers::validate_request;
use crate::models::PublicUser;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[garde(length(min = 3))]
    pub name: String,
    #[garde(length(min = 1), contains("@"))]
    pub email: String,
    #[garde(length(min = 8, max = 50))]
    pub password: String, // SecretBox不要（Deserialize後すぐハッシュ化）
}

/// POST /api/v1/auth/register
///
/// # Security
/// - パスワードはログに出力しない
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>), AppError> {
    validate_request(&request)?;

    let user = state
        .auth_service
        .register(request.name.trim(), request.email.trim(), &request.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("ユーザーを登録しました", user)),
    ))
}
