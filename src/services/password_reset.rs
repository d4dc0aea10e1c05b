use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;

use crate::config::SessionSettings;
use crate::error::{AppError, AppResult};
use crate::repositories::{PasswordResetTokenRepository, UserRepository};
use crate::services::email::EmailSender;
use crate::services::password::PasswordHasher;

const EMAIL_NOT_REGISTERED: &str = "指定されたメールアドレスは登録されていません";
const INVALID_RESET_TOKEN: &str = "リセットトークンが無効か、有効期限が切れています";
const EXPIRED_RESET_TOKEN: &str =
    "リセットトークンの有効期限が切れています。もう一度リクエストしてください";
const PASSWORD_UPDATED: &str =
    "パスワードを更新しました。新しいパスワードでログインしてください";

/// リセット要求の結果
///
/// token / reset_url は非本番モード、または本番でメール送信に失敗した場合のみ含める。
#[derive(Debug, Clone, Serialize)]
pub struct ResetRequested {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "resetUrl")]
    pub reset_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetCompleted {
    pub message: String,
}

/// パスワードリセットサービス
#[derive(Clone)]
pub struct PasswordResetService {
    users: Arc<dyn UserRepository>,
    reset_tokens: Arc<dyn PasswordResetTokenRepository>,
    hasher: PasswordHasher,
    mailer: Arc<dyn EmailSender>,
    settings: Arc<SessionSettings>,
}

impl PasswordResetService {
    /// 新しい PasswordResetService を作成
    pub fn new(
        users: Arc<dyn UserRepository>,
        reset_tokens: Arc<dyn PasswordResetTokenRepository>,
        hasher: PasswordHasher,
        mailer: Arc<dyn EmailSender>,
        settings: Arc<SessionSettings>,
    ) -> Self {
        Self {
            users,
            reset_tokens,
            hasher,
            mailer,
            settings,
        }
    }

    /// パスワードリセットをリクエスト
    ///
    /// # Security
    /// - トークン（平文）はログに出力しない
    /// - 未登録メールアドレスの扱いは `mask_unknown_reset_email` で切り替える
    pub async fn request_reset(&self, email: &str) -> AppResult<ResetRequested> {
        tracing::info!(email = %email, "パスワードリセットリクエスト");

        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None if self.settings.mask_unknown_reset_email => {
                tracing::info!(
                    email = %email,
                    "パスワードリセット: ユーザー不在（成功レスポンス返却）"
                );
                return Ok(ResetRequested {
                    message: sent_message(email),
                    token: None,
                    reset_url: None,
                });
            }
            None => {
                tracing::info!(email = %email, "パスワードリセット: ユーザー不在");
                return Err(AppError::BadRequest(EMAIL_NOT_REGISTERED.to_string()));
            }
        };

        let now = OffsetDateTime::now_utc();
        self.purge_expired_tokens(now).await;

        let token = self
            .reset_tokens
            .create_token(user.id, now + self.settings.password_reset_token_ttl)
            .await?;

        let reset_url = self.build_reset_url(&token);

        let delivery = self
            .mailer
            .send_password_reset(email, &reset_url, &token)
            .await;

        if !delivery.success {
            tracing::warn!(user_id = user.id, "パスワードリセットメール未送信");
        }

        let mut response = ResetRequested {
            message: sent_message(email),
            token: None,
            reset_url: None,
        };

        if !self.settings.production {
            // 開発モード: 動作確認用にトークンとURLを返す
            response.token = Some(token);
            response.reset_url = Some(reset_url);
        } else if !delivery.success {
            // 本番で送信失敗: サポート対応用にURLのみ返す
            response.reset_url = Some(reset_url);
        }

        Ok(response)
    }

    /// パスワードをリセット
    ///
    /// 提示されたトークンは期限切れ削除より先に照会する。
    /// 期限切れを「不明なトークン」ではなく期限切れとして報告するため。
    ///
    /// # Security
    /// - トークン・新パスワードはログに出力しない
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> AppResult<ResetCompleted> {
        let now = OffsetDateTime::now_utc();

        let reset_token = self.reset_tokens.find_by_value(token).await?;

        self.purge_expired_tokens(now).await;

        let reset_token =
            reset_token.ok_or_else(|| AppError::BadRequest(INVALID_RESET_TOKEN.to_string()))?;

        if reset_token.is_expired(now) {
            self.reset_tokens.delete_by_value(token).await?;
            tracing::warn!(user_id = reset_token.user_id, "期限切れトークン");
            return Err(AppError::Unauthorized(EXPIRED_RESET_TOKEN.to_string()));
        }

        let password_hash = self.hasher.hash(new_password).await?;

        self.users
            .update_password(reset_token.user_id, &password_hash)
            .await?;

        // 使い捨て: 削除によって無効化
        self.reset_tokens.delete_by_value(token).await?;

        tracing::info!(user_id = reset_token.user_id, "パスワードリセット完了");

        Ok(ResetCompleted {
            message: PASSWORD_UPDATED.to_string(),
        })
    }

    /// リセットURLを構築
    fn build_reset_url(&self, token: &str) -> String {
        format!(
            "{}/reset-password?token={}",
            self.settings.frontend_url.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }

    /// 期限切れトークンの削除（失敗しても本処理は続行）
    async fn purge_expired_tokens(&self, now: OffsetDateTime) {
        match self.reset_tokens.purge_expired(now).await {
            Ok(purged) if purged > 0 => {
                tracing::debug!(purged, "期限切れリセットトークンを削除");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = ?e, "リセットトークンの削除に失敗");
            }
        }
    }
}

fn sent_message(email: &str) -> String {
    format!(
        "アカウントが存在する場合、{email} にパスワード再設定用のリンクを送信しました。受信トレイ（迷惑メールフォルダも）をご確認ください"
    )
}
