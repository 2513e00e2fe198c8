//! # Domain Models
//!
//! These structs represent the core entities of the news board.
//! Identifiers are store-assigned integers wrapped in newtypes so a
//! comment id can never be passed where a newspost id is expected.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

id_type!(UserId);
id_type!(GroupId);
id_type!(PermissionId);
id_type!(NewspostId);
id_type!(CommentId);

/// Upper bound shared by newspost title, newspost body and comment text.
pub const MAX_TEXT_LEN: usize = 200;

/// Upper bound on usernames.
pub const MAX_USERNAME_LEN: usize = 150;

/// Shown in place of a comment author that no longer exists.
pub const DELETED_AUTHOR_NAME: &str = "[deleted]";

/// Well-known permission codenames seeded by the storage migrations.
pub mod perms {
    pub const ADD_NEWSPOST: &str = "add_newspost";
    pub const CHANGE_NEWSPOST: &str = "change_newspost";
    pub const DELETE_NEWSPOST: &str = "delete_newspost";
    pub const VIEW_NEWSPOST: &str = "view_newspost";
    pub const ADD_COMMENT: &str = "add_comment";
    pub const CHANGE_COMMENT: &str = "change_comment";
    pub const DELETE_COMMENT: &str = "delete_comment";
    pub const VIEW_COMMENT: &str = "view_comment";
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// PHC-formatted hash produced by a `CredentialHasher`.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    /// Bumped on logout. Tokens issued under an older epoch are dead.
    #[serde(skip_serializing, default)]
    pub session_epoch: i64,
}

/// Input for creating a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_staff: bool,
}

/// What a valid session token asserts about its bearer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaim {
    pub user: UserId,
    pub epoch: i64,
}

/// A named bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// An atomic capability, e.g. `add_comment` / "Can add comment".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub codename: String,
    pub name: String,
}

/// A published article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Newspost {
    pub id: NewspostId,
    pub newspost_title_text: String,
    pub newspost_main_text: String,
    /// Opaque media references resolved by the media collaborator.
    pub newspost_photo: Option<String>,
    pub newspost_audio: Option<String>,
    pub newspost_video: Option<String>,
    pub pub_date: DateTime<Utc>,
    /// Null once the author account is deleted.
    pub newspost_author: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct NewNewspost {
    pub title: String,
    pub main_text: String,
    pub photo: Option<String>,
    pub audio: Option<String>,
    pub video: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub author: Option<UserId>,
}

/// A moderated reply attached to a newspost, optionally to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub newspost_parent: NewspostId,
    pub comment_parent: Option<CommentId>,
    pub comment_text: String,
    pub pub_date: DateTime<Utc>,
    pub comment_author: Option<UserId>,
    pub approved_status: bool,
}

/// Input for creating a comment. New comments always start unapproved.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub newspost: NewspostId,
    pub parent: Option<CommentId>,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: Option<UserId>,
}

/// A comment together with its author's username as stored, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub comment: Comment,
    pub author_username: Option<String>,
}

/// Read-side projection of an approved comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub comment_author_name: String,
}

impl From<CommentRecord> for CommentView {
    fn from(record: CommentRecord) -> Self {
        Self {
            comment: record.comment,
            comment_author_name: record
                .author_username
                .unwrap_or_else(|| DELETED_AUTHOR_NAME.to_string()),
        }
    }
}

/// An authenticated caller and the permission codenames granted by its groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user: User,
    pub permissions: BTreeSet<String>,
}

impl Identity {
    pub fn has_permission(&self, codename: &str) -> bool {
        self.permissions.contains(codename)
    }
}

/// The acting identity of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl Viewer {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }
}
