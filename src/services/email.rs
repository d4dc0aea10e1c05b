use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;

/// メール送信結果
///
/// 送信失敗は例外ではなく `success: false` で表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryResult {
    pub success: bool,
}

/// パスワードリセットメールの送信先
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// 送信に失敗してもパニック・エラーにせず `success: false` を返すこと
    async fn send_password_reset(&self, to: &str, reset_url: &str, token: &str) -> DeliveryResult;
}

/// メール送信サービス
///
/// `email` 機能が有効かつSMTP設定がある場合のみ実際に送信する。
/// それ以外はログ出力のみで `success: false` を返す（開発用フォールバック）。
#[derive(Clone)]
pub struct EmailService {
    config: Arc<Config>,
}

impl EmailService {
    /// 新しい EmailService を作成
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn smtp_configured(&self) -> bool {
        self.config.smtp_host.is_some()
            && self.config.smtp_username.is_some()
            && self.config.smtp_password.is_some()
    }

    #[cfg(feature = "email")]
    async fn send_via_smtp(&self, to: &str, reset_url: &str, token: &str) -> anyhow::Result<()> {
        use lettre::message::header::ContentType;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
        use secrecy::ExposeSecret;

        let host = self
            .config
            .smtp_host
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("smtp host not configured"))?;
        let username = self
            .config
            .smtp_username
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("smtp username not configured"))?
            .expose_secret()
            .clone();
        let password = self
            .config
            .smtp_password
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("smtp password not configured"))?
            .expose_secret()
            .clone();
        let from = self
            .config
            .email_from
            .clone()
            .unwrap_or_else(|| username.clone());

        let message = Message::builder()
            .from(from.parse()?)
            .to(to.parse()?)
            .subject(RESET_EMAIL_SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(build_email_html(reset_url, token))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(username, password))
            .build();

        mailer.send(message).await?;
        Ok(())
    }
}

#[async_trait]
impl EmailSender for EmailService {
    #[cfg_attr(not(feature = "email"), allow(unused_variables))]
    async fn send_password_reset(&self, to: &str, reset_url: &str, token: &str) -> DeliveryResult {
        if self.smtp_configured() {
            #[cfg(feature = "email")]
            match self.send_via_smtp(to, reset_url, token).await {
                Ok(()) => {
                    tracing::info!(to = %to, "パスワードリセットメール送信完了（SMTP）");
                    return DeliveryResult { success: true };
                }
                Err(e) => {
                    tracing::warn!(error = ?e, to = %to, "SMTP送信失敗、ログ出力にフォールバック");
                }
            }

            #[cfg(not(feature = "email"))]
            tracing::warn!("SMTP設定がありますが email 機能が無効です");
        }

        // 開発モード: メール送信せずログ出力のみ
        if self.config.production {
            tracing::warn!(to = %to, "パスワードリセットメールを送信できませんでした");
        } else {
            // URL はトークンを含むのでログに出さない
            tracing::info!(to = %to, "パスワードリセットリンクを生成（開発モード、メール未送信）");
        }

        DeliveryResult { success: false }
    }
}

#[cfg(feature = "email")]
const RESET_EMAIL_SUBJECT: &str = "パスワード再設定のご案内 - Finanzly";

/// リセットメール本文（HTML）
pub fn build_email_html(reset_url: &str, token: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; color: #111; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #0066cc;">パスワードの再設定</h2>
  <p>パスワード再設定のリクエストを受け付けました。以下のリンクから手続きを続けてください。</p>
  <p><a href="{reset_url}" target="_blank" rel="noopener noreferrer">パスワードを再設定する</a></p>
  <p style="color: #666; font-size: 14px;">リンクが開けない場合は、次のURLをブラウザに貼り付けてください。</p>
  <p style="word-break: break-all; font-size: 12px;">{reset_url}</p>
  <p style="color: #666; font-size: 12px;">確認コード: {token}</p>
  <hr />
  <p style="color: #666; font-size: 12px;">心当たりがない場合は、このメールを破棄してください。</p>
  <p style="color: #999; font-size: 11px;">このリンクの有効期限は1時間です。</p>
</div>"#
    )
}
