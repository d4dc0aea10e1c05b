use secrecy::SecretBox;
use serde::Deserialize;
use time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub database_url: SecretBox<String>,
    /// アクセストークン署名用シークレット（HS256）
    pub jwt_access_secret: SecretBox<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    // トークン寿命設定
    #[serde(default = "default_access_token_ttl_minutes")]
    pub access_token_ttl_minutes: i64,
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: i64,
    /// リフレッシュトークンの絶対寿命（有効期限とは独立）
    #[serde(default = "default_refresh_token_max_age_hours")]
    pub refresh_token_max_age_hours: i64,
    #[serde(default = "default_password_reset_token_ttl_secs")]
    pub password_reset_token_ttl_secs: i64,

    // パスワードリセット設定
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// 未登録メールアドレスへのリセット要求を成功扱いにするか
    #[serde(default)]
    pub reset_request_masks_unknown_email: bool,

    /// 本番モード（Cookie属性とトークン開示を切り替える）
    #[serde(default)]
    pub production: bool,

    /// CORS許可オリジン（カンマ区切り）
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    // SMTP設定（オプション - email機能有効時のみ使用）
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<SecretBox<String>>,
    pub smtp_password: Option<SecretBox<String>>,
    #[serde(default)]
    pub email_from: Option<String>,
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;
const DEFAULT_REFRESH_TOKEN_MAX_AGE_HOURS: i64 = 24;
const DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS: i64 = 3600;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_access_token_ttl_minutes() -> i64 {
    DEFAULT_ACCESS_TOKEN_TTL_MINUTES
}

fn default_refresh_token_ttl_days() -> i64 {
    DEFAULT_REFRESH_TOKEN_TTL_DAYS
}

fn default_refresh_token_max_age_hours() -> i64 {
    DEFAULT_REFRESH_TOKEN_MAX_AGE_HOURS
}

fn default_password_reset_token_ttl_secs() -> i64 {
    DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS
}

fn default_frontend_url() -> String {
    DEFAULT_FRONTEND_URL.to_string()
}

fn default_allowed_origins() -> String {
    DEFAULT_FRONTEND_URL.to_string()
}

impl Config {
    pub fn load() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// CORS許可オリジンを分割して返す
    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// セッション層の設定
///
/// サービスにはこの値だけを渡し、ビジネスロジック内で環境変数を読まない。
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub refresh_token_max_age: Duration,
    pub password_reset_token_ttl: Duration,
    pub frontend_url: String,
    pub production: bool,
    pub mask_unknown_reset_email: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::minutes(DEFAULT_ACCESS_TOKEN_TTL_MINUTES),
            refresh_token_ttl: Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS),
            refresh_token_max_age: Duration::hours(DEFAULT_REFRESH_TOKEN_MAX_AGE_HOURS),
            password_reset_token_ttl: Duration::seconds(DEFAULT_PASSWORD_RESET_TOKEN_TTL_SECS),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            production: false,
            mask_unknown_reset_email: false,
        }
    }
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            access_token_ttl: Duration::minutes(config.access_token_ttl_minutes),
            refresh_token_ttl: Duration::days(config.refresh_token_ttl_days),
            refresh_token_max_age: Duration::hours(config.refresh_token_max_age_hours),
            password_reset_token_ttl: Duration::seconds(config.password_reset_token_ttl_secs),
            frontend_url: config.frontend_url.clone(),
            production: config.production,
            mask_unknown_reset_email: config.reset_request_masks_unknown_email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_settings_match_reference_lifetimes() {
        let settings = SessionSettings::default();
        assert_eq!(settings.access_token_ttl, Duration::minutes(15));
        assert_eq!(settings.refresh_token_ttl, Duration::days(7));
        assert_eq!(settings.refresh_token_max_age, Duration::hours(24));
        assert_eq!(settings.password_reset_token_ttl, Duration::hours(1));
        assert!(!settings.production);
    }
}
