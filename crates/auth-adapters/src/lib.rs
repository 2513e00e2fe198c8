//! # auth-adapters
//!
//! Credential hashing, session tokens and bot verification.

pub mod password;
pub mod recaptcha;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use password::Argon2Hasher;
pub use recaptcha::{RecaptchaVerifier, GOOGLE_SITEVERIFY_URL};

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtSessions;
