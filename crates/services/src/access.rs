//! # Access Control Gate
//!
//! Every protected operation declares an ordered list of guards. The list is
//! evaluated before the operation body runs; the first failing guard
//! short-circuits with its error.

use domains::{perms, AppError, Identity, Result, Viewer};

/// A single pre-invocation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The caller must be logged in.
    Authenticated,
    /// The caller must hold this permission codename through a group.
    Permission(&'static str),
}

impl Guard {
    fn check(&self, viewer: &Viewer) -> Result<()> {
        match (self, viewer) {
            (_, Viewer::Anonymous) => Err(AppError::AuthenticationRequired),
            (Guard::Authenticated, Viewer::Authenticated(_)) => Ok(()),
            (Guard::Permission(codename), Viewer::Authenticated(identity)) => {
                if identity.has_permission(codename) {
                    Ok(())
                } else {
                    Err(AppError::Forbidden((*codename).to_string()))
                }
            }
        }
    }
}

/// Guards for the full newspost listing.
pub const LIST_POSTS: &[Guard] = &[Guard::Authenticated, Guard::Permission(perms::VIEW_NEWSPOST)];

/// Guards for a single newspost with its approved comments.
pub const VIEW_POST: &[Guard] = &[Guard::Authenticated, Guard::Permission(perms::VIEW_NEWSPOST)];

/// Guards for comment submission.
pub const SUBMIT_COMMENT: &[Guard] = &[Guard::Authenticated, Guard::Permission(perms::ADD_COMMENT)];

/// Runs `guards` in order against `viewer`.
///
/// An empty list admits everyone and yields `None`. A non-empty list that
/// passes always yields the caller's identity, since every guard requires
/// authentication.
pub fn authorize<'v>(viewer: &'v Viewer, guards: &[Guard]) -> Result<Option<&'v Identity>> {
    for guard in guards {
        if let Err(err) = guard.check(viewer) {
            tracing::debug!(?guard, error = %err, "access denied");
            return Err(err);
        }
    }
    Ok(viewer.identity())
}

/// Like [`authorize`], for guard lists that require authentication.
pub fn require<'v>(viewer: &'v Viewer, guards: &[Guard]) -> Result<&'v Identity> {
    authorize(viewer, guards)?.ok_or(AppError::AuthenticationRequired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{User, UserId};

    fn viewer_with(permissions: &[&str]) -> Viewer {
        Viewer::Authenticated(Identity {
            user: User {
                id: UserId(1),
                username: "boozle".into(),
                password_hash: String::new(),
                is_staff: false,
                date_joined: Utc::now(),
                session_epoch: 0,
            },
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        })
    }

    #[test]
    fn anonymous_caller_needs_authentication() {
        let err = authorize(&Viewer::Anonymous, LIST_POSTS).unwrap_err();
        assert_eq!(err, AppError::AuthenticationRequired);
    }

    #[test]
    fn authenticated_caller_without_permission_is_forbidden() {
        let viewer = viewer_with(&[perms::ADD_COMMENT]);
        let err = authorize(&viewer, LIST_POSTS).unwrap_err();
        assert_eq!(err, AppError::Forbidden(perms::VIEW_NEWSPOST.to_string()));
    }

    #[test]
    fn granted_permission_passes_and_returns_identity() {
        let viewer = viewer_with(&[perms::VIEW_NEWSPOST]);
        let identity = require(&viewer, VIEW_POST).unwrap();
        assert_eq!(identity.user.username, "boozle");
    }

    #[test]
    fn comment_submission_checks_add_comment() {
        let viewer = viewer_with(&[perms::VIEW_NEWSPOST]);
        assert_eq!(
            authorize(&viewer, SUBMIT_COMMENT).unwrap_err(),
            AppError::Forbidden(perms::ADD_COMMENT.to_string())
        );
    }

    #[test]
    fn empty_guard_list_admits_anonymous() {
        assert_eq!(authorize(&Viewer::Anonymous, &[]).unwrap(), None);
        assert_eq!(
            require(&Viewer::Anonymous, &[]).unwrap_err(),
            AppError::AuthenticationRequired
        );
    }
}
