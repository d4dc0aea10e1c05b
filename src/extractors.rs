use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::error::AppError;
use crate::handlers::cookies::ACCESS_COOKIE;
use crate::services::AccessClaims;
use crate::state::AppState;

/// 検証済みアクセストークンのクレーム
///
/// `Authorization: Bearer <token>` を優先し、なければ Cookie `token` を使う。
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AccessClaims);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| {
                CookieJar::from_headers(&parts.headers)
                    .get(ACCESS_COOKIE)
                    .map(|cookie| cookie.value().to_string())
            })
            .ok_or_else(|| AppError::Unauthorized("アクセストークンが必要です".to_string()))?;

        let claims = state.auth_service.verify_access_token(&token)?;

        Ok(Self(claims))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
