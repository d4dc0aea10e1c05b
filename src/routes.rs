use axum::{
    Router,
    routing::{get, post},
};
use http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::CorsLayer;

use crate::handlers::{self, cookies::AUTH_PATH};
use crate::state::AppState;

/// Router の構築
pub fn create_router(state: AppState) -> Router {
    let auth = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
        .route("/logout-all", post(handlers::logout_all))
        .route("/me", get(handlers::current_user))
        .route("/sessions", get(handlers::sessions))
        .route("/forgot-password", post(handlers::forgot_password))
        .route("/reset-password", post(handlers::reset_password));

    Router::new()
        .route("/api/health", get(handlers::health_check))
        .nest(AUTH_PATH, auth)
        .with_state(state)
}

/// CORS 設定
///
/// Cookie を送受信するため credentials を許可する。
/// その場合ワイルドカードは使えないので、オリジンは明示的に列挙する。
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = ?e, origin = %origin, "不正なオリジンを無視");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}
