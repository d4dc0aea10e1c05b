pub mod auth;
pub mod email;
pub mod password;
pub mod password_reset;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::AuthService;
pub use email::{DeliveryResult, EmailSender, EmailService};
pub use password::PasswordHasher;
pub use password_reset::PasswordResetService;
pub use token::{AccessClaims, TokenSigner};
