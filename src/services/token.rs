//! アクセストークン（HS256 JWT）とリフレッシュトークン値の発行

use data_encoding::HEXLOWER;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{AppError, AppResult};
use crate::models::PublicUser;

/// リフレッシュトークンのバイト長（16進表記で128文字）
pub const REFRESH_TOKEN_BYTES: usize = 64;

const INVALID_ACCESS_TOKEN: &str = "トークンが無効または期限切れです";

/// アクセストークンのクレーム
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub user: PublicUser,
    pub iat: i64,
    pub exp: i64,
}

/// トークン署名サービス
///
/// アクセストークンはDB参照なしで検証できる。
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &[u8], access_token_ttl: Duration, refresh_token_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_ttl,
            refresh_token_ttl,
        }
    }

    /// 既定の寿命でアクセストークンを発行
    pub fn issue_access_token(&self, user: &PublicUser) -> AppResult<String> {
        self.issue_access_token_with_ttl(user, self.access_token_ttl)
    }

    pub fn issue_access_token_with_ttl(
        &self,
        user: &PublicUser,
        ttl: Duration,
    ) -> AppResult<String> {
        let now = OffsetDateTime::now_utc();
        let claims = AccessClaims {
            user: user.clone(),
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = ?e, "アクセストークン署名エラー");
            AppError::Internal(anyhow::anyhow!("jwt encode error"))
        })
    }

    /// 署名・形式・有効期限を検証してクレームを返す
    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = ?e, "アクセストークン検証失敗");
                AppError::Unauthorized(INVALID_ACCESS_TOKEN.to_string())
            })
    }

    /// 64バイトのランダムなリフレッシュトークン値を生成（16進エンコード）
    pub fn generate_refresh_token_value(&self) -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        HEXLOWER.encode(&bytes)
    }

    pub fn refresh_token_expiry(&self, now: OffsetDateTime) -> OffsetDateTime {
        now + self.refresh_token_ttl
    }
}
