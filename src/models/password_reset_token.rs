use sqlx::FromRow;
use time::OffsetDateTime;

/// パスワードリセットトークン
///
/// 使い捨て。使用済みフラグは持たず、削除によって無効化する。
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: i32,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl PasswordResetToken {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}
