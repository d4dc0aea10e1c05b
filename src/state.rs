use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::{Config, SessionSettings};
use crate::repositories::Repositories;
use crate::services::{
    AuthService, EmailSender, EmailService, PasswordHasher, PasswordResetService, TokenSigner,
};

/// アプリケーション共有状態
///
/// axum の State として全ハンドラーで共有される。
/// Clone は必須（axum が内部で clone するため）。
#[derive(Clone)]
pub struct AppState {
    /// 認証・セッションサービス
    pub auth_service: AuthService,
    /// パスワードリセットサービス
    pub password_reset_service: PasswordResetService,
    /// セッション設定（Cookie属性の決定に使う）
    pub settings: Arc<SessionSettings>,
}

impl AppState {
    /// 構築済みの依存から AppState を作成
    pub fn new(
        repos: Repositories,
        hasher: PasswordHasher,
        signer: TokenSigner,
        mailer: Arc<dyn EmailSender>,
        settings: SessionSettings,
    ) -> Self {
        let settings = Arc::new(settings);

        let auth_service = AuthService::new(
            repos.users.clone(),
            repos.refresh_tokens,
            hasher,
            signer,
            settings.clone(),
        );
        let password_reset_service = PasswordResetService::new(
            repos.users,
            repos.reset_tokens,
            hasher,
            mailer,
            settings.clone(),
        );

        Self {
            auth_service,
            password_reset_service,
            settings,
        }
    }

    /// 設定と PostgreSQL プールから AppState を作成
    pub fn from_config(db_pool: PgPool, config: Arc<Config>) -> Self {
        let settings = SessionSettings::from(config.as_ref());
        let signer = TokenSigner::new(
            config.jwt_access_secret.expose_secret().as_bytes(),
            settings.access_token_ttl,
            settings.refresh_token_ttl,
        );
        let mailer = Arc::new(EmailService::new(config.clone()));

        Self::new(
            Repositories::postgres(db_pool),
            PasswordHasher::default(),
            signer,
            mailer,
            settings,
        )
    }
}
