use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::error::AppResult;
use crate::models::RefreshToken;

/// リフレッシュトークンの永続化
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// 有効（revoked = false）なトークンを登録
    async fn create(
        &self,
        user_id: i32,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> AppResult<RefreshToken>;

    async fn find_by_value(&self, token: &str) -> AppResult<Option<RefreshToken>>;

    /// revoked を true にする（冪等）
    async fn revoke(&self, token: &str) -> AppResult<()>;

    /// 未失効の場合のみ失効させる条件付き更新
    ///
    /// # Returns
    /// この呼び出しで失効させた場合は true。既に失効済み・不在なら false。
    async fn revoke_if_active(&self, token: &str) -> AppResult<bool>;

    /// ユーザーの未失効トークンをすべて失効させる
    ///
    /// # Returns
    /// 失効させた件数
    async fn revoke_all_for_user(&self, user_id: i32) -> AppResult<u64>;

    /// `expires_at < now` または失効済みのトークンを削除
    ///
    /// # Returns
    /// 削除された行数
    async fn purge_expired_or_revoked(&self, now: OffsetDateTime) -> AppResult<u64>;

    /// 未失効かつ期限内のトークン一覧（作成日時の新しい順）
    async fn find_active_for_user(
        &self,
        user_id: i32,
        now: OffsetDateTime,
    ) -> AppResult<Vec<RefreshToken>>;
}

#[derive(Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn create(
        &self,
        user_id: i32,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> AppResult<RefreshToken> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING token, user_id, created_at, expires_at, revoked
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_value(&self, token: &str) -> AppResult<Option<RefreshToken>> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token, user_id, created_at, expires_at, revoked
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true
            WHERE token = $1
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_if_active(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true
            WHERE token = $1 AND revoked = false
            "#,
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all_for_user(&self, user_id: i32) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = true
            WHERE user_id = $1 AND revoked = false
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn purge_expired_or_revoked(&self, now: OffsetDateTime) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at < $1 OR revoked = true
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_active_for_user(
        &self,
        user_id: i32,
        now: OffsetDateTime,
    ) -> AppResult<Vec<RefreshToken>> {
        let records = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token, user_id, created_at, expires_at, revoked
            FROM refresh_tokens
            WHERE user_id = $1 AND revoked = false AND expires_at > $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
