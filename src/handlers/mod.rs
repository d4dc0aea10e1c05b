pub mod cookies;
pub mod health;
pub mod login;
pub mod logout;
pub mod password_reset;
pub mod refresh;
pub mod register;
pub mod response;
pub mod session;

pub use health::health_check;
pub use login::login;
pub use logout::{logout, logout_all};
pub use password_reset::{forgot_password, reset_password};
pub use refresh::refresh;
pub use register::register;
pub use session::{current_user, sessions};

use crate::error::AppError;

/// garde によるリクエストバリデーション
pub(crate) fn validate_request<T>(request: &T) -> Result<(), AppError>
where
    T: garde::Validate,
    T::Context: Default,
{
    request
        .validate()
        .map_err(|report| AppError::BadRequest(format!("入力内容が不正です: {report}")))
}
