//! HS256 session tokens. Each token carries the session epoch of its user,
//! so bumping the epoch in the store revokes it.

use std::time::Duration;

use chrono::Utc;
use domains::{AppError, Result, SessionClaim, SessionTokens, User, UserId};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    /// Session epoch at issue time.
    sep: i64,
    iat: i64,
    exp: i64,
}

pub struct JwtSessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtSessions {
    pub fn new(secret: &SecretString, ttl: Duration) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation: Validation::default(),
            ttl,
        }
    }

    fn issue_at(&self, claim: SessionClaim, issued_at: i64) -> Result<String> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: claim.user.to_string(),
            sep: claim.epoch,
            iat: issued_at,
            exp: issued_at.saturating_add(ttl),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(AppError::internal)
    }
}

impl SessionTokens for JwtSessions {
    fn issue(&self, user: &User) -> Result<String> {
        let claim = SessionClaim {
            user: user.id,
            epoch: user.session_epoch,
        };
        self.issue_at(claim, Utc::now().timestamp())
    }

    fn resolve(&self, token: &str) -> Option<SessionClaim> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => {
                let user = data.claims.sub.parse::<i64>().ok().map(UserId)?;
                Some(SessionClaim {
                    user,
                    epoch: data.claims.sep,
                })
            }
            Err(err) => {
                tracing::debug!(error = %err, "rejected session token");
                None
            }
        }
    }
}
