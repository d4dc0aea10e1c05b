use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;
use garde::Validate;
use serde::Deserialize;

use crate::error::AppError;
use crate::handlers::cookies::refresh_cookie;
use crate::handlers::response::ApiResponse;
use crate::handlers::validate_request;
use crate::services::auth::LoginResponse;
use crate::state::AppState;

/// ログインリクエスト
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(length(min = 1))]
    pub email: String,
    #[garde(length(min = 1))]
    pub password: String,
}

/// POST /api/v1/auth/login
///
/// 処理フロー:
/// 1. リクエストバリデーション
/// 2. 認証とトークン発行
/// 3. リフレッシュトークンを httpOnly Cookie に設定
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, CookieJar, Json<ApiResponse<LoginResponse>>), AppError> {
    validate_request(&request)?;

    let login = state
        .auth_service
        .login(request.email.trim(), &request.password)
        .await?;

    let jar = jar.add(refresh_cookie(&login.refresh_token, &state.settings));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(ApiResponse::success("ログインしました", login)),
    ))
}
