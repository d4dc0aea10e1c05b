pub mod memory;
pub mod password_reset_token;
pub mod refresh_token;
pub mod user;

use std::sync::Arc;

use sqlx::PgPool;

pub use memory::MemoryStore;
pub use password_reset_token::{PasswordResetTokenRepository, PgPasswordResetTokenRepository};
pub use refresh_token::{PgRefreshTokenRepository, RefreshTokenRepository};
pub use user::{PgUserRepository, UserRepository};

/// プロセス起動時に一度だけ構築し、各サービスへ注入するリポジトリ群
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub reset_tokens: Arc<dyn PasswordResetTokenRepository>,
}

impl Repositories {
    /// PostgreSQL 実装
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            refresh_tokens: Arc::new(PgRefreshTokenRepository::new(pool.clone())),
            reset_tokens: Arc::new(PgPasswordResetTokenRepository::new(pool)),
        }
    }

    /// インメモリ実装（全リポジトリが同じストアを共有）
    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            refresh_tokens: Arc::new(store.clone()),
            reset_tokens: Arc::new(store),
        }
    }
}
