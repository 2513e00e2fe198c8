//! # reCAPTCHA Bot-Verification Client
//!
//! Posts `secret` and `response` as a form to the `siteverify` endpoint and
//! reads the boolean `success` out of the JSON answer.

use std::time::Duration;

use async_trait::async_trait;
use domains::{AppError, BotVerifier, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub const GOOGLE_SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

pub struct RecaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret_key: SecretString,
}

fn upstream(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::UpstreamUnavailable("siteverify timed out".into())
    } else {
        AppError::UpstreamUnavailable(err.to_string())
    }
}

impl RecaptchaVerifier {
    /// `timeout` bounds the whole request, connect through body.
    pub fn new(secret_key: SecretString, verify_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AppError::internal)?;
        Ok(Self {
            client,
            verify_url: verify_url.into(),
            secret_key,
        })
    }

    /// The raw check. Transport failures, non-2xx statuses and bodies without
    /// a boolean `success` are `UpstreamUnavailable`.
    pub async fn siteverify(&self, response_token: &str) -> Result<bool> {
        let body: SiteVerifyResponse = self
            .client
            .post(&self.verify_url)
            .form(&[
                ("secret", self.secret_key.expose_secret()),
                ("response", response_token),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(upstream)?
            .json()
            .await
            .map_err(upstream)?;

        if !body.success {
            tracing::debug!(error_codes = ?body.error_codes, "siteverify rejected token");
        }
        Ok(body.success)
    }
}

#[async_trait]
impl BotVerifier for RecaptchaVerifier {
    async fn verify(&self, response_token: &str) -> bool {
        if response_token.is_empty() {
            return false;
        }
        match self.siteverify(response_token).await {
            Ok(success) => success,
            Err(err) => {
                tracing::warn!(error = %err, "bot verification failed closed");
                false
            }
        }
    }
}
