use crate::error::{AppError, AppResult};

/// bcrypt コストの既定値
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// ユーザー不在時のタイミング差を埋めるためのダミーハッシュ（cost 10）
const DUMMY_HASH: &str = "$2b$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";

/// パスワードハッシュ（bcrypt）
///
/// ハッシュ計算は CPU を占有するため `spawn_blocking` で実行し、
/// 他リクエストの処理を止めない。
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// ソルト付きハッシュを生成（呼び出しごとに新しいソルト）
    pub async fn hash(&self, password: &str) -> AppResult<String> {
        let password = password.to_owned();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "パスワードハッシュ処理のタスクエラー");
                AppError::Internal(anyhow::anyhow!("password hash task failed"))
            })?
            .map_err(|e| {
                tracing::error!(error = ?e, "パスワードハッシュ生成エラー");
                AppError::Internal(anyhow::anyhow!("password hash error"))
            })
    }

    /// パスワードを検証
    ///
    /// 不正な形式のハッシュは例外ではなく `false` として扱う。
    pub async fn verify(&self, password: &str, hash: &str) -> bool {
        let password = password.to_owned();
        let hash = hash.to_owned();

        match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await {
            Ok(Ok(matched)) => matched,
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, "パスワードハッシュのパースエラー");
                false
            }
            Err(e) => {
                tracing::error!(error = ?e, "パスワード検証処理のタスクエラー");
                false
            }
        }
    }

    /// ダミーのパスワード検証を実行（結果は常に破棄）
    pub async fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, DUMMY_HASH).await;
    }
}
