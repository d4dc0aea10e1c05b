use async_trait::async_trait;
use data_encoding::HEXLOWER;
use rand::RngCore;
use rand::rngs::OsRng;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::error::AppResult;
use crate::models::PasswordResetToken;

/// リセットトークンのバイト長（16進表記で64文字）
pub const RESET_TOKEN_BYTES: usize = 32;

/// パスワードリセットトークンの永続化
#[async_trait]
pub trait PasswordResetTokenRepository: Send + Sync {
    /// 新しいトークンを生成して保存し、平文のトークン値を返す
    ///
    /// # Note
    /// 戻り値はリクエスト者のメールにのみ渡すこと。ログ出力禁止。
    async fn create_token(&self, user_id: i32, expires_at: OffsetDateTime) -> AppResult<String>;

    async fn find_by_value(&self, token: &str) -> AppResult<Option<PasswordResetToken>>;

    /// 使用済み・期限切れのどちらの場合もこれで無効化する
    async fn delete_by_value(&self, token: &str) -> AppResult<()>;

    /// `expires_at < now` のトークンを削除
    ///
    /// # Returns
    /// 削除された行数
    async fn purge_expired(&self, now: OffsetDateTime) -> AppResult<u64>;
}

/// 32バイトのランダムトークンを生成（16進エンコード）
pub fn generate_reset_token_value() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    HEXLOWER.encode(&bytes)
}

#[derive(Clone)]
pub struct PgPasswordResetTokenRepository {
    pool: PgPool,
}

impl PgPasswordResetTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PasswordResetTokenRepository for PgPasswordResetTokenRepository {
    async fn create_token(&self, user_id: i32, expires_at: OffsetDateTime) -> AppResult<String> {
        let token = generate_reset_token_value();

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    /// # Note
    /// 有効期限の検証は呼び出し側で行う
    async fn find_by_value(&self, token: &str) -> AppResult<Option<PasswordResetToken>> {
        let record = sqlx::query_as::<_, PasswordResetToken>(
            r#"
            SELECT token, user_id, created_at, expires_at
            FROM password_reset_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_by_value(&self, token: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM password_reset_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_reset_tokens
            WHERE expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
