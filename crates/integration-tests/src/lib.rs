//! # integration-tests
//!
//! Wires the real SQLite store, Argon2 hasher and JWT sessions behind the
//! services and the router. Only the bot check is stubbed: it accepts
//! [`HUMAN_TOKEN`] and nothing else.

use std::sync::Arc;
use std::time::Duration;

use api_adapters::{AppState, Limits};
use auth_adapters::{Argon2Hasher, JwtSessions};
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use domains::{
    perms, AccountRepo, BotVerifier, Comment, CommentId, Identity, MockBotVerifier, NewComment,
    NewNewspost, NewUser, NewsRepo, Newspost, NewspostId, SessionTokens, User, Viewer,
};
use secrecy::SecretString;
use services::{AccountService, GroupBootstrap, NewsService};
use storage_adapters::SqliteStore;
use tower::ServiceExt;

pub const HUMAN_TOKEN: &str = "human";
pub const DEFAULT_GROUP: &str = "Average";

pub fn default_group_permissions() -> Vec<String> {
    [perms::ADD_COMMENT, perms::VIEW_COMMENT, perms::VIEW_NEWSPOST]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

/// Knobs for a single harness.
#[derive(Debug, Clone)]
pub struct Options {
    pub default_group_permissions: Vec<String>,
    /// When false the bot check rejects every token.
    pub bots_pass: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            default_group_permissions: default_group_permissions(),
            bots_pass: true,
        }
    }
}

pub fn stub_verifier(bots_pass: bool) -> Arc<dyn BotVerifier> {
    let mut verifier = MockBotVerifier::new();
    verifier
        .expect_verify()
        .returning(move |token| bots_pass && token == HUMAN_TOKEN);
    Arc::new(verifier)
}

pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub sessions: Arc<JwtSessions>,
    pub news: Arc<NewsService>,
    pub accounts: Arc<AccountService>,
    options: Options,
}

impl Harness {
    /// Fresh in-memory store with default options.
    pub async fn new() -> Self {
        Self::with_options(Options::default()).await
    }

    pub async fn with_options(options: Options) -> Self {
        let store = SqliteStore::in_memory().await.expect("in-memory store");
        Self::on_store(store, options)
    }

    pub fn on_store(store: SqliteStore, options: Options) -> Self {
        let store = Arc::new(store);
        let sessions = Arc::new(JwtSessions::new(
            &SecretString::from("integration-secret".to_string()),
            Duration::from_secs(3600),
        ));
        let verifier = stub_verifier(options.bots_pass);

        let news = Arc::new(NewsService::new(store.clone(), verifier.clone()));
        let accounts = Arc::new(AccountService::new(
            store.clone(),
            Arc::new(Argon2Hasher::new()),
            verifier,
            sessions.clone(),
            GroupBootstrap::new(
                store.clone(),
                DEFAULT_GROUP,
                options.default_group_permissions.clone(),
            ),
        ));

        Self {
            store,
            sessions,
            news,
            accounts,
            options,
        }
    }

    pub fn bootstrap(&self) -> GroupBootstrap {
        GroupBootstrap::new(
            self.store.clone(),
            DEFAULT_GROUP,
            self.options.default_group_permissions.clone(),
        )
    }

    pub fn router(&self) -> Router {
        api_adapters::router(AppState {
            news: self.news.clone(),
            accounts: self.accounts.clone(),
            limits: Limits::default(),
        })
    }

    /// A user enrolled in the default group, bypassing registration.
    pub async fn member(&self, username: &str) -> User {
        let group = self
            .bootstrap()
            .ensure_default_group()
            .await
            .expect("default group");
        self.create_user(username, false, &[group.group.id]).await
    }

    /// A user that belongs to no group and so holds no permissions.
    pub async fn outsider(&self, username: &str) -> User {
        self.create_user(username, false, &[]).await
    }

    pub async fn staff(&self, username: &str) -> User {
        self.create_user(username, true, &[]).await
    }

    async fn create_user(&self, username: &str, is_staff: bool, groups: &[domains::GroupId]) -> User {
        self.store
            .create_user(
                NewUser {
                    username: username.to_string(),
                    password_hash: "unused".to_string(),
                    is_staff,
                },
                groups,
            )
            .await
            .expect("create user")
    }

    pub async fn viewer(&self, user: &User) -> Viewer {
        let permissions = self
            .store
            .user_permissions(user.id)
            .await
            .expect("user permissions");
        Viewer::Authenticated(Identity {
            user: user.clone(),
            permissions: permissions.into_iter().collect(),
        })
    }

    pub fn bearer(&self, user: &User) -> String {
        let token = self.sessions.issue(user).expect("issue token");
        format!("Bearer {token}")
    }

    pub async fn post(&self, title: &str, pub_date: DateTime<Utc>, author: Option<&User>) -> Newspost {
        self.store
            .create_newspost(NewNewspost {
                title: title.to_string(),
                main_text: format!("{title} body"),
                photo: None,
                audio: None,
                video: None,
                pub_date,
                author: author.map(|u| u.id),
            })
            .await
            .expect("create newspost")
    }

    pub async fn comment(
        &self,
        post: NewspostId,
        parent: Option<CommentId>,
        text: &str,
        author: Option<&User>,
        approved: bool,
    ) -> Comment {
        let comment = self
            .store
            .create_comment(NewComment {
                newspost: post,
                parent,
                text: text.to_string(),
                pub_date: Utc::now(),
                author: author.map(|u| u.id),
            })
            .await
            .expect("create comment");
        if approved {
            assert!(self.store.approve_comment(comment.id).await.expect("approve"));
        }
        comment
    }
}

/// A fully buffered response. Empty bodies decode to `Value::Null`.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl Reply {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION)?.to_str().ok()
    }
}

pub async fn send(router: Router, request: Request<Body>) -> Reply {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    Reply { status, headers, body }
}

pub fn get(path: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(path);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).expect("request")
}

/// A urlencoded form POST, e.g. `form("/login/", None, "username=a&password=b")`.
pub fn form(path: &str, authorization: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(path).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}
