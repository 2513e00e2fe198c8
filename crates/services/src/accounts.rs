//! # Account Service
//!
//! Registration, login, logout and viewer resolution. Registration and
//! login both sit behind the bot check.

use std::sync::Arc;

use domains::{
    AccountRepo, AppError, BotVerifier, CredentialHasher, Identity, NewUser, Result,
    SessionTokens, User, Viewer, MAX_USERNAME_LEN, REQUEST_ISSUE,
};

use crate::bootstrap::GroupBootstrap;

/// Shown to users who registered while the default group was first provisioned.
pub const PENDING_VALIDATION_NOTICE: &str =
    "Your account may need further validation before full access";

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub password1: String,
    pub password2: String,
    pub bot_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user: User,
    pub notice: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub user: User,
    pub token: String,
}

pub struct AccountService {
    accounts: Arc<dyn AccountRepo>,
    hasher: Arc<dyn CredentialHasher>,
    verifier: Arc<dyn BotVerifier>,
    tokens: Arc<dyn SessionTokens>,
    bootstrap: GroupBootstrap,
}

/// Every rejected registration looks the same to the caller; the cause is
/// only logged.
fn rejected(cause: &str) -> AppError {
    tracing::info!(%cause, "registration rejected");
    AppError::ValidationFailed(REQUEST_ISSUE.to_string())
}

fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        hasher: Arc<dyn CredentialHasher>,
        verifier: Arc<dyn BotVerifier>,
        tokens: Arc<dyn SessionTokens>,
        bootstrap: GroupBootstrap,
    ) -> Self {
        Self {
            accounts,
            hasher,
            verifier,
            tokens,
            bootstrap,
        }
    }

    /// Creates an account and enrolls it into the default group.
    ///
    /// A missing permission in the default group configuration surfaces as
    /// `UnknownPermission` and leaves no user behind.
    pub async fn register(&self, req: RegisterRequest) -> Result<Registration> {
        let username = req.username.trim();
        if !valid_username(username) {
            return Err(rejected("invalid username"));
        }
        if req.password1.is_empty() {
            return Err(rejected("empty password"));
        }
        if req.password1 != req.password2 {
            return Err(rejected("password mismatch"));
        }
        if !self.verifier.verify(&req.bot_token).await {
            return Err(rejected("bot check failed"));
        }
        if self.accounts.find_user_by_username(username).await?.is_some() {
            return Err(rejected("username taken"));
        }

        let ensured = self.bootstrap.ensure_default_group().await?;
        let password_hash = self.hasher.hash_password(&req.password1).await?;

        let user = self
            .accounts
            .create_user(
                NewUser {
                    username: username.to_string(),
                    password_hash,
                    is_staff: false,
                },
                &[ensured.group.id],
            )
            .await
            .map_err(|err| match err {
                AppError::Conflict(_) => rejected("username taken"),
                other => other,
            })?;

        tracing::info!(user = %user.id, username = %user.username, group = %ensured.group.name, "registered user");
        Ok(Registration {
            user,
            notice: ensured.created.then_some(PENDING_VALIDATION_NOTICE),
        })
    }

    pub async fn login(&self, username: &str, password: &str, bot_token: &str) -> Result<LoginSuccess> {
        if !self.verifier.verify(bot_token).await {
            return Err(AppError::VerificationFailed);
        }

        let Some(user) = self.accounts.find_user_by_username(username.trim()).await? else {
            self.hasher.equalize_timing(password).await;
            return Err(AppError::InvalidCredentials);
        };
        if !self.hasher.verify_password(password, &user.password_hash).await {
            tracing::info!(user = %user.id, "login with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        tracing::info!(user = %user.id, "user logged in");
        Ok(LoginSuccess { user, token })
    }

    /// Revokes every token of the viewer's account. Idempotent: logging out
    /// an anonymous viewer is a no-op.
    pub async fn logout(&self, viewer: &Viewer) -> Result<()> {
        let Some(identity) = viewer.identity() else {
            return Ok(());
        };
        self.accounts.revoke_sessions(identity.user.id).await?;
        tracing::info!(user = %identity.user.id, "user logged out");
        Ok(())
    }

    /// Turns a bearer token into the request's viewer. Bad, revoked or
    /// expired tokens and deleted accounts degrade to anonymous.
    pub async fn resolve_viewer(&self, token: Option<&str>) -> Result<Viewer> {
        let Some(claim) = token.and_then(|t| self.tokens.resolve(t)) else {
            return Ok(Viewer::Anonymous);
        };
        let Some(user) = self.accounts.get_user(claim.user).await? else {
            tracing::debug!(user = %claim.user, "token for a deleted user");
            return Ok(Viewer::Anonymous);
        };
        if claim.epoch != user.session_epoch {
            tracing::debug!(user = %user.id, "token from a closed session");
            return Ok(Viewer::Anonymous);
        }
        let permissions = self.accounts.user_permissions(user.id).await?;
        Ok(Viewer::Authenticated(Identity {
            user,
            permissions: permissions.into_iter().collect(),
        }))
    }

    /// Staff accounts for the about page.
    pub async fn list_staff(&self) -> Result<Vec<User>> {
        self.accounts.list_staff().await
    }
}
