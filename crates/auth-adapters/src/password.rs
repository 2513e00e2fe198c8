//! Argon2-based implementation of `CredentialHasher`.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use domains::{AppError, CredentialHasher, Result};

/// Well-formed hash with the default Argon2id parameters that no password
/// is expected to match.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$bmV3c2JvYXJkLWR1bW15IQ$AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8";

/// Hashing is CPU-bound, so both operations run on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialHasher for Argon2Hasher {
    async fn hash_password(&self, password: &str) -> Result<String> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
        })
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::internal)
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    /// Unparseable hashes never match.
    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || {
            let parsed_hash = match PasswordHash::new(&hash) {
                Ok(p) => p,
                Err(_) => return false,
            };
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok()
        })
        .await
        .unwrap_or(false)
    }

    async fn equalize_timing(&self, password: &str) {
        self.verify_password(password, DUMMY_HASH).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash_password("asdf@1234").await.unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(hasher.verify_password("asdf@1234", &hash).await);
        assert!(!hasher.verify_password("asdf@9999", &hash).await);
    }

    #[tokio::test]
    async fn garbage_hash_never_matches() {
        assert!(!Argon2Hasher::new().verify_password("pw", "not-a-phc-string").await);
    }

    #[test]
    fn dummy_hash_costs_as_much_as_a_real_one() {
        let parsed = PasswordHash::new(DUMMY_HASH).unwrap();
        let params = argon2::Params::try_from(&parsed).unwrap();
        assert_eq!(params.m_cost(), argon2::Params::DEFAULT_M_COST);
        assert_eq!(params.t_cost(), argon2::Params::DEFAULT_T_COST);
        assert_eq!(params.p_cost(), argon2::Params::DEFAULT_P_COST);
    }

    #[tokio::test]
    async fn dummy_hash_does_not_match_typical_passwords() {
        let hasher = Argon2Hasher::new();
        for pw in ["", "password", "asdf@1234"] {
            assert!(!hasher.verify_password(pw, DUMMY_HASH).await);
        }
        hasher.equalize_timing("password").await;
    }

    #[tokio::test]
    async fn salts_differ_between_hashes() {
        let hasher = Argon2Hasher::new();
        let a = hasher.hash_password("same").await.unwrap();
        let b = hasher.hash_password("same").await.unwrap();
        assert_ne!(a, b);
    }
}
