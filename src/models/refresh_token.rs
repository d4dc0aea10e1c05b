use serde::Serialize;
use sqlx::FromRow;
use time::{Duration, OffsetDateTime};

/// 発行済みリフレッシュトークン
///
/// 状態遷移: active → revoked のみ。revoked から戻る経路はない。
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: i32,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub revoked: bool,
}

impl RefreshToken {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }

    pub fn age(&self, now: OffsetDateTime) -> Duration {
        now - self.created_at
    }
}

/// アクティブなセッション（トークン値は含めない）
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActiveSession {
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<&RefreshToken> for ActiveSession {
    fn from(token: &RefreshToken) -> Self {
        Self {
            created_at: token.created_at,
            expires_at: token.expires_at,
        }
    }
}
