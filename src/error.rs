use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

/// エラー種別（HTTPステータスクラスと1対1で対応）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    DuplicateResource,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 形式は正しいがビジネスルールに違反する入力
    #[error("{0}")]
    BadRequest(String),

    /// 資格情報・トークンの検証失敗
    #[error("{0}")]
    Unauthorized(String),

    /// 一意制約違反
    #[error("{0}")]
    DuplicateResource(String),

    #[error("データベースエラー")]
    Database(#[from] sqlx::Error),

    #[error("内部エラー")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::DuplicateResource(_) => ErrorKind::DuplicateResource,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::DuplicateResource => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::BadRequest(msg) | Self::Unauthorized(msg) | Self::DuplicateResource(msg) => {
                msg.clone()
            }
            Self::Database(e) => {
                tracing::error!(error = ?e, "データベースエラー");
                "内部エラーが発生しました".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "内部エラー");
                "内部エラーが発生しました".to_string()
            }
        };

        (
            status,
            Json(ErrorResponse {
                status: "error",
                message,
            }),
        )
            .into_response()
    }
}
