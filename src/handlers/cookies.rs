//! 認証Cookieの生成

use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::SessionSettings;

/// リフレッシュトークンのCookie名
pub const REFRESH_COOKIE: &str = "refreshToken";
/// アクセストークンのCookie名（Authorization ヘッダーがない場合に参照）
pub const ACCESS_COOKIE: &str = "token";
/// 認証エンドポイントのパス（リフレッシュCookieのスコープ）
pub const AUTH_PATH: &str = "/api/v1/auth";

/// リフレッシュトークン用の httpOnly Cookie
///
/// 本番: Secure + SameSite=Strict、開発: SameSite=Lax
pub fn refresh_cookie(token: &str, settings: &SessionSettings) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token.to_string()))
        .http_only(true)
        .secure(settings.production)
        .same_site(same_site(settings))
        .path(AUTH_PATH)
        .max_age(settings.refresh_token_ttl)
        .build()
}

/// リフレッシュCookieを削除するためのCookie（同じパス・属性）
pub fn clear_refresh_cookie(settings: &SessionSettings) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .http_only(true)
        .secure(settings.production)
        .same_site(same_site(settings))
        .path(AUTH_PATH)
        .build()
}

fn same_site(settings: &SessionSettings) -> SameSite {
    if settings.production {
        SameSite::Strict
    } else {
        SameSite::Lax
    }
}
