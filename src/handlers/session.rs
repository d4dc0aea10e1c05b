use axum::{Json, extract::State};

use crate::error::AppError;
use crate::extractors::AuthenticatedUser;
use crate::handlers::response::ApiResponse;
use crate::models::ActiveSession;
use crate::services::AccessClaims;
use crate::state::AppState;

/// GET /api/v1/auth/me
///
/// 検証済みアクセストークンのクレームを返す
pub async fn current_user(
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Json<ApiResponse<AccessClaims>> {
    Json(ApiResponse::success("認証済みユーザー", claims))
}

/// GET /api/v1/auth/sessions
///
/// ログイン中ユーザーのアクティブなセッション一覧
pub async fn sessions(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<ActiveSession>>>, AppError> {
    let sessions = state.auth_service.active_sessions(claims.user.id).await?;

    Ok(Json(ApiResponse::success("セッション一覧", sessions)))
}
