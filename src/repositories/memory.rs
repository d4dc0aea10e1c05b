use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::models::{PasswordResetToken, RefreshToken, User};
use crate::repositories::password_reset_token::generate_reset_token_value;
use crate::repositories::user::EMAIL_ALREADY_REGISTERED;
use crate::repositories::{PasswordResetTokenRepository, RefreshTokenRepository, UserRepository};

/// インメモリ実装（単体テスト・結合テスト用）
///
/// 3つのリポジトリトレイトを1つのストアで実装する。
/// Clone したインスタンスは同じデータを共有する。
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_user_id: i32,
    users: HashMap<i32, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    reset_tokens: HashMap<String, PasswordResetToken>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 作成日時・有効期限を指定してリフレッシュトークンを直接登録
    pub async fn insert_refresh_token(&self, record: RefreshToken) {
        let mut inner = self.inner.lock().await;
        inner.refresh_tokens.insert(record.token.clone(), record);
    }

    /// 作成日時・有効期限を指定してリセットトークンを直接登録
    pub async fn insert_reset_token(&self, record: PasswordResetToken) {
        let mut inner = self.inner.lock().await;
        inner.reset_tokens.insert(record.token.clone(), record);
    }

    /// ユーザーを削除（関連トークンもカスケード削除）
    #[cfg(test)]
    pub async fn delete_user(&self, user_id: i32) -> bool {
        let mut inner = self.inner.lock().await;
        inner.refresh_tokens.retain(|_, t| t.user_id != user_id);
        inner.reset_tokens.retain(|_, t| t.user_id != user_id);
        inner.users.remove(&user_id).is_some()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: i32) -> AppResult<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn create(&self, name: &str, email: &str, password_hash: &str) -> AppResult<User> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.email == email) {
            return Err(AppError::DuplicateResource(
                EMAIL_ALREADY_REGISTERED.to_string(),
            ));
        }

        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_password(&self, user_id: i32, new_password_hash: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.password_hash = new_password_hash.to_string();
        }
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn create(
        &self,
        user_id: i32,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> AppResult<RefreshToken> {
        let record = RefreshToken {
            token: token.to_string(),
            user_id,
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            revoked: false,
        };
        let mut inner = self.inner.lock().await;
        inner
            .refresh_tokens
            .insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_value(&self, token: &str) -> AppResult<Option<RefreshToken>> {
        let inner = self.inner.lock().await;
        Ok(inner.refresh_tokens.get(token).cloned())
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(record) = inner.refresh_tokens.get_mut(token) {
            record.revoked = true;
        }
        Ok(())
    }

    async fn revoke_if_active(&self, token: &str) -> AppResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.refresh_tokens.get_mut(token) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: i32) -> AppResult<u64> {
        let mut inner = self.inner.lock().await;
        let mut revoked = 0;
        for record in inner.refresh_tokens.values_mut() {
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn purge_expired_or_revoked(&self, now: OffsetDateTime) -> AppResult<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.refresh_tokens.len();
        inner
            .refresh_tokens
            .retain(|_, t| !(t.expires_at < now || t.revoked));
        Ok((before - inner.refresh_tokens.len()) as u64)
    }

    async fn find_active_for_user(
        &self,
        user_id: i32,
        now: OffsetDateTime,
    ) -> AppResult<Vec<RefreshToken>> {
        let inner = self.inner.lock().await;
        let mut records: Vec<RefreshToken> = inner
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id && !t.revoked && t.expires_at > now)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[async_trait]
impl PasswordResetTokenRepository for MemoryStore {
    async fn create_token(&self, user_id: i32, expires_at: OffsetDateTime) -> AppResult<String> {
        let token = generate_reset_token_value();
        let record = PasswordResetToken {
            token: token.clone(),
            user_id,
            created_at: OffsetDateTime::now_utc(),
            expires_at,
        };
        let mut inner = self.inner.lock().await;
        inner.reset_tokens.insert(token.clone(), record);
        Ok(token)
    }

    async fn find_by_value(&self, token: &str) -> AppResult<Option<PasswordResetToken>> {
        let inner = self.inner.lock().await;
        Ok(inner.reset_tokens.get(token).cloned())
    }

    async fn delete_by_value(&self, token: &str) -> AppResult<()> {
        let mut inner = self.inner.lock().await;
        inner.reset_tokens.remove(token);
        Ok(())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> AppResult<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.reset_tokens.len();
        inner.reset_tokens.retain(|_, t| t.expires_at >= now);
        Ok((before - inner.reset_tokens.len()) as u64)
    }
}
