use axum::{Json, extract::State};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::error::AppError;
use crate::extractors::AuthenticatedUser;
use crate::handlers::cookies::{REFRESH_COOKIE, clear_refresh_cookie};
use crate::handlers::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/auth/logout
///
/// Cookie のリフレッシュトークンを失効させ、Cookie を削除する。
/// Cookie がなくても成功を返す。
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<()>>), AppError> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        state.auth_service.logout(cookie.value()).await?;
    }

    let jar = jar.remove(clear_refresh_cookie(&state.settings));

    Ok((jar, Json(ApiResponse::message("ログアウトしました"))))
}

#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub revoked: u64,
}

/// POST /api/v1/auth/logout-all
///
/// ログイン中ユーザーの全リフレッシュトークンを失効させる（全端末からログアウト）。
pub async fn logout_all(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<LogoutAllResponse>>), AppError> {
    let revoked = state.auth_service.logout_all(claims.user.id).await?;

    let jar = jar.remove(clear_refresh_cookie(&state.settings));

    Ok((
        jar,
        Json(ApiResponse::success(
            "全てのセッションからログアウトしました",
            LogoutAllResponse { revoked },
        )),
    ))
}
