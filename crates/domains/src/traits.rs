//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be wired into the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Comment, CommentId, CommentRecord, Group, GroupId, NewComment, NewNewspost, NewUser, Newspost,
    NewspostId, Permission, PermissionId, SessionClaim, User, UserId,
};

/// Persistence contract for newsposts and their comment threads.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NewsRepo: Send + Sync {
    // Newspost Operations
    async fn create_newspost(&self, post: NewNewspost) -> Result<Newspost>;
    async fn get_newspost(&self, id: NewspostId) -> Result<Option<Newspost>>;
    /// Newest first by `pub_date`, at most `limit` rows.
    async fn list_newsposts(&self, limit: u32) -> Result<Vec<Newspost>>;
    /// Deletes the post and, transitively, every comment on it.
    async fn delete_newspost(&self, id: NewspostId) -> Result<bool>;

    // Comment Operations
    /// Fails with `ValidationFailed` when the parent comment is on another post.
    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;
    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>>;
    /// Approved comments of one post, oldest first, joined with author usernames.
    async fn list_approved_comments(&self, post: NewspostId) -> Result<Vec<CommentRecord>>;
    /// Every comment of one post regardless of approval. Moderation use only.
    async fn list_comments(&self, post: NewspostId) -> Result<Vec<Comment>>;
    /// One-way transition to approved. Returns false if the comment is missing.
    async fn approve_comment(&self, id: CommentId) -> Result<bool>;
    /// Deletes the comment and its replies.
    async fn delete_comment(&self, id: CommentId) -> Result<bool>;
}

/// Persistence contract for users, groups and permissions.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// Creates the user and its group memberships atomically.
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, user: NewUser, groups: &[GroupId]) -> Result<User>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;
    /// Nulls author references on newsposts and comments instead of deleting them.
    async fn delete_user(&self, id: UserId) -> Result<bool>;
    async fn list_staff(&self) -> Result<Vec<User>>;
    /// Advances the user's session epoch, invalidating every issued token.
    /// Returns false if the user is missing.
    async fn revoke_sessions(&self, id: UserId) -> Result<bool>;
    /// Codenames granted through any group the user belongs to.
    async fn user_permissions(&self, id: UserId) -> Result<Vec<String>>;

    async fn find_permission(&self, codename: &str) -> Result<Option<Permission>>;
    async fn find_group(&self, name: &str) -> Result<Option<Group>>;
    /// Atomic lookup-or-create by name. Permissions are only assigned when
    /// this call creates the group; the flag reports whether it did.
    async fn get_or_create_group(
        &self,
        name: &str,
        permissions: &[PermissionId],
    ) -> Result<(Group, bool)>;
    async fn group_permissions(&self, id: GroupId) -> Result<Vec<Permission>>;
    async fn list_groups(&self) -> Result<Vec<Group>>;
}

/// Third-party challenge-response check (e.g. reCAPTCHA).
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BotVerifier: Send + Sync {
    /// Fails closed: any transport or decoding problem yields `false`.
    async fn verify(&self, response_token: &str) -> bool;
}

/// Password hashing contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String>;
    /// Verifies if a provided password matches a stored hash.
    async fn verify_password(&self, password: &str, hash: &str) -> bool;
    /// Does the work of a failed verification when there is no stored hash,
    /// so unknown usernames cost as much as wrong passwords.
    async fn equalize_timing(&self, password: &str);
}

/// Issues and resolves opaque session tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SessionTokens: Send + Sync {
    /// The token is bound to `user.session_epoch`.
    fn issue(&self, user: &User) -> Result<String>;
    /// `None` for malformed, forged or expired tokens.
    fn resolve(&self, token: &str) -> Option<SessionClaim>;
}
