//! サービス層テスト用のフィクスチャ

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Barrier, Mutex};

use crate::config::SessionSettings;
use crate::error::{AppError, AppResult};
use crate::models::{PasswordResetToken, PublicUser, RefreshToken};
use crate::repositories::{
    MemoryStore, PasswordResetTokenRepository, RefreshTokenRepository, Repositories,
};
use crate::services::email::{DeliveryResult, EmailSender};
use crate::services::{AuthService, PasswordHasher, PasswordResetService, TokenSigner};

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub reset_url: String,
    pub token: String,
}

/// 送信内容を記録するだけのメーラー
pub struct RecordingMailer {
    succeed: bool,
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn new(succeed: bool) -> Self {
        Self {
            succeed,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub async fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send_password_reset(&self, to: &str, reset_url: &str, token: &str) -> DeliveryResult {
        self.sent.lock().await.push(SentEmail {
            to: to.to_string(),
            reset_url: reset_url.to_string(),
            token: token.to_string(),
        });
        DeliveryResult {
            success: self.succeed,
        }
    }
}

pub struct TestContext {
    pub store: MemoryStore,
    pub auth: AuthService,
    pub password_reset: PasswordResetService,
    pub mailer: Arc<RecordingMailer>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_settings(SessionSettings::default(), true)
    }

    pub fn with_settings(settings: SessionSettings, delivery_succeeds: bool) -> Self {
        let store = MemoryStore::new();
        let repos = Repositories::in_memory(store.clone());
        Self::build(store, repos, settings, delivery_succeeds)
    }

    /// 一部のリポジトリを差し替えたコンテキスト（データは `store` と共有）
    pub fn with_repositories(store: MemoryStore, repos: Repositories) -> Self {
        Self::build(store, repos, SessionSettings::default(), true)
    }

    fn build(
        store: MemoryStore,
        repos: Repositories,
        settings: SessionSettings,
        delivery_succeeds: bool,
    ) -> Self {
        let settings = Arc::new(settings);
        // テストでは bcrypt の最小コストを使う
        let hasher = PasswordHasher::new(4);
        let signer = TokenSigner::new(
            b"test-secret",
            settings.access_token_ttl,
            settings.refresh_token_ttl,
        );
        let mailer = Arc::new(RecordingMailer::new(delivery_succeeds));

        let auth = AuthService::new(
            repos.users.clone(),
            repos.refresh_tokens.clone(),
            hasher,
            signer,
            settings.clone(),
        );
        let password_reset = PasswordResetService::new(
            repos.users,
            repos.reset_tokens,
            hasher,
            mailer.clone(),
            settings,
        );

        Self {
            store,
            auth,
            password_reset,
            mailer,
        }
    }
}

pub async fn register_default_user(ctx: &TestContext) -> PublicUser {
    ctx.auth
        .register("Ana", "a@b.com", "Secret123")
        .await
        .expect("register default user")
}

/// 期限切れ削除だけが常に失敗するストア
#[derive(Clone)]
pub struct FailingPurgeStore {
    inner: MemoryStore,
}

impl FailingPurgeStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self { inner }
    }

    /// ユーザーはそのまま、トークン系2つを差し替えた Repositories
    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: Arc::new(self.inner.clone()),
            refresh_tokens: Arc::new(self.clone()),
            reset_tokens: Arc::new(self.clone()),
        }
    }
}

fn purge_failure() -> AppError {
    AppError::Internal(anyhow::anyhow!("purge unavailable"))
}

#[async_trait]
impl RefreshTokenRepository for FailingPurgeStore {
    async fn create(
        &self,
        user_id: i32,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> AppResult<RefreshToken> {
        RefreshTokenRepository::create(&self.inner, user_id, token, expires_at).await
    }

    async fn find_by_value(&self, token: &str) -> AppResult<Option<RefreshToken>> {
        RefreshTokenRepository::find_by_value(&self.inner, token).await
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        self.inner.revoke(token).await
    }

    async fn revoke_if_active(&self, token: &str) -> AppResult<bool> {
        self.inner.revoke_if_active(token).await
    }

    async fn revoke_all_for_user(&self, user_id: i32) -> AppResult<u64> {
        self.inner.revoke_all_for_user(user_id).await
    }

    async fn purge_expired_or_revoked(&self, _now: OffsetDateTime) -> AppResult<u64> {
        Err(purge_failure())
    }

    async fn find_active_for_user(
        &self,
        user_id: i32,
        now: OffsetDateTime,
    ) -> AppResult<Vec<RefreshToken>> {
        self.inner.find_active_for_user(user_id, now).await
    }
}

#[async_trait]
impl PasswordResetTokenRepository for FailingPurgeStore {
    async fn create_token(&self, user_id: i32, expires_at: OffsetDateTime) -> AppResult<String> {
        self.inner.create_token(user_id, expires_at).await
    }

    async fn find_by_value(&self, token: &str) -> AppResult<Option<PasswordResetToken>> {
        PasswordResetTokenRepository::find_by_value(&self.inner, token).await
    }

    async fn delete_by_value(&self, token: &str) -> AppResult<()> {
        self.inner.delete_by_value(token).await
    }

    async fn purge_expired(&self, _now: OffsetDateTime) -> AppResult<u64> {
        Err(purge_failure())
    }
}

/// 照会結果を返す前に、もう一方の照会が終わるまで待つリフレッシュトークンストア
///
/// 2つのリフレッシュを「どちらも未失効を確認した後」の状態に揃えるために使う。
pub struct LookupBarrierStore {
    inner: MemoryStore,
    barrier: Barrier,
}

impl LookupBarrierStore {
    pub fn new(inner: MemoryStore, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl RefreshTokenRepository for LookupBarrierStore {
    async fn create(
        &self,
        user_id: i32,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> AppResult<RefreshToken> {
        RefreshTokenRepository::create(&self.inner, user_id, token, expires_at).await
    }

    async fn find_by_value(&self, token: &str) -> AppResult<Option<RefreshToken>> {
        let found = RefreshTokenRepository::find_by_value(&self.inner, token).await;
        self.barrier.wait().await;
        found
    }

    async fn revoke(&self, token: &str) -> AppResult<()> {
        self.inner.revoke(token).await
    }

    async fn revoke_if_active(&self, token: &str) -> AppResult<bool> {
        self.inner.revoke_if_active(token).await
    }

    async fn revoke_all_for_user(&self, user_id: i32) -> AppResult<u64> {
        self.inner.revoke_all_for_user(user_id).await
    }

    async fn purge_expired_or_revoked(&self, now: OffsetDateTime) -> AppResult<u64> {
        self.inner.purge_expired_or_revoked(now).await
    }

    async fn find_active_for_user(
        &self,
        user_id: i32,
        now: OffsetDateTime,
    ) -> AppResult<Vec<RefreshToken>> {
        self.inner.find_active_for_user(user_id, now).await
    }
}
