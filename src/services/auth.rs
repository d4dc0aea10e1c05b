use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;

use crate::config::SessionSettings;
use crate::error::{AppError, AppResult};
use crate::models::{ActiveSession, PublicUser};
use crate::repositories::user::EMAIL_ALREADY_REGISTERED;
use crate::repositories::{RefreshTokenRepository, UserRepository};
use crate::services::password::PasswordHasher;
use crate::services::token::{AccessClaims, TokenSigner};

pub const TOKEN_TYPE: &str = "bearer";

const INVALID_CREDENTIALS: &str = "メールアドレスまたはパスワードが正しくありません";
const REFRESH_TOKEN_NOT_FOUND: &str = "リフレッシュトークンが見つかりません";
const REFRESH_TOKEN_REVOKED: &str =
    "リフレッシュトークンは失効しています。再度ログインしてください";
const REFRESH_TOKEN_EXPIRED: &str =
    "リフレッシュトークンの有効期限が切れています。再度ログインしてください";
const REFRESH_TOKEN_TOO_OLD: &str = "リフレッシュトークンが古すぎます。再度ログインしてください";
const TOKEN_USER_NOT_FOUND: &str =
    "トークンに紐づくユーザーが見つかりません。再度ログインしてください";

/// ログイン結果
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: PublicUser,
    pub refresh_token: String,
}

/// リフレッシュ結果（新しいトークンの組）
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// 認証・セッションサービス
///
/// リフレッシュトークンはローテーション方式（1回使い切り）。
/// 1つのログインから発行されるトークンは直線的な連鎖になる。
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    hasher: PasswordHasher,
    signer: TokenSigner,
    settings: Arc<SessionSettings>,
}

impl AuthService {
    /// 新しい AuthService を作成
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        hasher: PasswordHasher,
        signer: TokenSigner,
        settings: Arc<SessionSettings>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            hasher,
            signer,
            settings,
        }
    }

    /// ユーザー登録
    ///
    /// # Security
    /// パスワードはログに出力しない
    pub async fn register(&self, name: &str, email: &str, password: &str) -> AppResult<PublicUser> {
        if self.users.find_by_email(email).await?.is_some() {
            tracing::info!(email = %email, "登録失敗: メールアドレス重複");
            return Err(AppError::DuplicateResource(
                EMAIL_ALREADY_REGISTERED.to_string(),
            ));
        }

        let password_hash = self.hasher.hash(password).await?;
        let user = self.users.create(name, email, &password_hash).await?;

        tracing::info!(user_id = user.id, email = %email, "ユーザー登録成功");

        Ok(PublicUser::from(&user))
    }

    /// ログイン
    ///
    /// メールアドレス不在とパスワード不一致は同じエラーを返す（登録有無の漏洩防止）。
    /// タイミング攻撃対策: ユーザー不在時もダミーのパスワード検証を実行
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginResponse> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                self.hasher.verify_dummy(password).await;
                tracing::warn!(email = %email, "認証失敗: ユーザー不在");
                return Err(AppError::BadRequest(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !self.hasher.verify(password, &user.password_hash).await {
            tracing::warn!(email = %email, "認証失敗: パスワード不一致");
            return Err(AppError::BadRequest(INVALID_CREDENTIALS.to_string()));
        }

        let public_user = PublicUser::from(&user);
        let access_token = self.signer.issue_access_token(&public_user)?;
        let refresh_token = self
            .issue_refresh_token(user.id, OffsetDateTime::now_utc())
            .await?;

        tracing::info!(user_id = user.id, "ログイン成功");

        Ok(LoginResponse {
            access_token,
            token_type: TOKEN_TYPE,
            user: public_user,
            refresh_token,
        })
    }

    /// リフレッシュトークンをローテーションして新しいトークンの組を発行
    ///
    /// # Security
    /// - 失効済みトークンの提示は再利用（盗用）の可能性があるため警告ログを出す
    /// - 有効期限とは別に、作成からの絶対寿命を超えたトークンは拒否する
    /// - 失効は条件付き更新で行い、同一トークンの同時提示では一方しか成功しない
    pub async fn refresh(&self, presented: &str) -> AppResult<TokenPair> {
        let now = OffsetDateTime::now_utc();

        self.purge_refresh_tokens(now).await;

        let stored = self
            .refresh_tokens
            .find_by_value(presented)
            .await?
            .ok_or_else(|| {
                tracing::warn!("リフレッシュ失敗: トークン不在");
                AppError::Unauthorized(REFRESH_TOKEN_NOT_FOUND.to_string())
            })?;

        if stored.revoked {
            tracing::warn!(user_id = stored.user_id, "失効済みリフレッシュトークンの再利用を検知");
            return Err(AppError::Unauthorized(REFRESH_TOKEN_REVOKED.to_string()));
        }

        if stored.is_expired(now) {
            self.refresh_tokens.revoke(presented).await?;
            tracing::info!(user_id = stored.user_id, "リフレッシュ失敗: 期限切れ");
            return Err(AppError::Unauthorized(REFRESH_TOKEN_EXPIRED.to_string()));
        }

        if stored.age(now) >= self.settings.refresh_token_max_age {
            self.refresh_tokens.revoke(presented).await?;
            tracing::warn!(user_id = stored.user_id, "リフレッシュ失敗: 絶対寿命超過");
            return Err(AppError::Unauthorized(REFRESH_TOKEN_TOO_OLD.to_string()));
        }

        // ローテーション: 新しいトークンを発行する前に必ず失効させる
        if !self.refresh_tokens.revoke_if_active(presented).await? {
            tracing::warn!(user_id = stored.user_id, "リフレッシュトークンの同時使用を検知");
            return Err(AppError::Unauthorized(REFRESH_TOKEN_REVOKED.to_string()));
        }

        let user = self
            .users
            .find_by_id(stored.user_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = stored.user_id, "リフレッシュ失敗: ユーザー不在");
                AppError::BadRequest(TOKEN_USER_NOT_FOUND.to_string())
            })?;

        let access_token = self.signer.issue_access_token(&PublicUser::from(&user))?;
        let refresh_token = self.issue_refresh_token(user.id, now).await?;

        tracing::info!(user_id = user.id, "トークンをローテーション");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// ログアウト（提示されたリフレッシュトークンを失効）
    ///
    /// 不明なトークンでもエラーにしない（冪等）。
    pub async fn logout(&self, presented: &str) -> AppResult<()> {
        self.refresh_tokens.revoke(presented).await?;
        tracing::info!("ログアウト完了");
        Ok(())
    }

    /// ユーザーの全セッションを失効
    pub async fn logout_all(&self, user_id: i32) -> AppResult<u64> {
        let revoked = self.refresh_tokens.revoke_all_for_user(user_id).await?;
        tracing::info!(user_id, revoked, "全セッションを失効");
        Ok(revoked)
    }

    /// アクティブなセッション一覧（トークン値は返さない）
    pub async fn active_sessions(&self, user_id: i32) -> AppResult<Vec<ActiveSession>> {
        let tokens = self
            .refresh_tokens
            .find_active_for_user(user_id, OffsetDateTime::now_utc())
            .await?;
        Ok(tokens.iter().map(ActiveSession::from).collect())
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        self.signer.verify_access_token(token)
    }

    async fn issue_refresh_token(&self, user_id: i32, now: OffsetDateTime) -> AppResult<String> {
        let value = self.signer.generate_refresh_token_value();
        let expires_at = self.signer.refresh_token_expiry(now);
        self.refresh_tokens
            .create(user_id, &value, expires_at)
            .await?;
        Ok(value)
    }

    /// 期限切れ・失効済みトークンの削除（失敗してもリフレッシュは続行）
    async fn purge_refresh_tokens(&self, now: OffsetDateTime) {
        match self.refresh_tokens.purge_expired_or_revoked(now).await {
            Ok(purged) if purged > 0 => {
                tracing::debug!(purged, "期限切れ・失効済みリフレッシュトークンを削除");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = ?e, "リフレッシュトークンの削除に失敗");
            }
        }
    }
}
