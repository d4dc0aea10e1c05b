use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::error::AppError;
use crate::handlers::cookies::{REFRESH_COOKIE, refresh_cookie};
use crate::handlers::response::ApiResponse;
use crate::services::auth::TOKEN_TYPE;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// POST /api/v1/auth/refresh
///
/// Cookie のリフレッシュトークンをローテーションし、新しいアクセストークンを返す。
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<RefreshResponse>>), AppError> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("リフレッシュトークンがありません".to_string()))?;

    let pair = state.auth_service.refresh(&presented).await?;

    let jar = jar.add(refresh_cookie(&pair.refresh_token, &state.settings));

    Ok((
        jar,
        Json(ApiResponse::success(
            "トークンを更新しました",
            RefreshResponse {
                access_token: pair.access_token,
                token_type: TOKEN_TYPE,
            },
        )),
    ))
}
