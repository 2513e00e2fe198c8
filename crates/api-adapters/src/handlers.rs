//! # Handlers
//!
//! Coordinates the flow between HTTP requests and the services. Handlers
//! return JSON context objects for an external renderer; they never build
//! HTML or cookies.

use axum::{
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Form, Json,
};
use domains::{Newspost, NewspostId, User};
use serde::{Deserialize, Serialize};
use services::{CommentSubmission, PostDetail, RegisterRequest};

use crate::{error::ApiError, extract::CurrentViewer, state::AppState};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct PostListContext {
    pub latest_post_list: Vec<Newspost>,
}

#[derive(Debug, Serialize)]
pub struct AboutContext {
    pub admin_list: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct RegisterContext {
    pub username: String,
    pub notice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct LoginContext {
    pub username: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
    #[serde(default, rename = "g-recaptcha-response")]
    pub bot_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "g-recaptcha-response")]
    pub bot_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub comment_text: String,
    #[serde(default, rename = "g-recaptcha-response")]
    pub bot_token: String,
}

fn post_view_path(id: NewspostId) -> String {
    format!("/news/{id}/")
}

/// For gated routes: an anonymous caller is sent to login and back here.
fn gated(uri: &OriginalUri) -> impl FnOnce(domains::AppError) -> ApiError + '_ {
    move |err| ApiError::from(err).resume_at(uri.0.path())
}

/// Public home page: the few newest posts, possibly none.
pub async fn home(State(state): State<AppState>) -> ApiResult<Json<PostListContext>> {
    let latest_post_list = state.news.list_recent_posts(state.limits.home).await?;
    Ok(Json(PostListContext { latest_post_list }))
}

pub async fn about(State(state): State<AppState>) -> ApiResult<Json<AboutContext>> {
    let admin_list = state.accounts.list_staff().await?;
    Ok(Json(AboutContext { admin_list }))
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> ApiResult<impl IntoResponse> {
    let registration = state
        .accounts
        .register(RegisterRequest {
            username: form.username,
            password1: form.password1,
            password2: form.password2,
            bot_token: form.bot_token,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterContext {
            username: registration.user.username,
            notice: registration.notice,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Json<LoginContext>> {
    let success = state
        .accounts
        .login(&form.username, &form.password, &form.bot_token)
        .await?;
    Ok(Json(LoginContext {
        username: success.user.username,
        token: success.token,
    }))
}

/// Ends the caller's session and lands on the home page, logged in or not.
pub async fn logout(
    State(state): State<AppState>,
    CurrentViewer(viewer): CurrentViewer,
) -> ApiResult<Redirect> {
    state.accounts.logout(&viewer).await?;
    Ok(Redirect::to("/"))
}

pub async fn posts(
    State(state): State<AppState>,
    uri: OriginalUri,
    CurrentViewer(viewer): CurrentViewer,
) -> ApiResult<Json<PostListContext>> {
    let latest_post_list = state
        .news
        .list_posts(&viewer, state.limits.list)
        .await
        .map_err(gated(&uri))?;
    Ok(Json(PostListContext { latest_post_list }))
}

pub async fn post_specific(
    State(state): State<AppState>,
    uri: OriginalUri,
    CurrentViewer(viewer): CurrentViewer,
    Path(newspost_id): Path<i64>,
) -> ApiResult<Json<PostDetail>> {
    let detail = state
        .news
        .view_post(&viewer, NewspostId(newspost_id))
        .await
        .map_err(gated(&uri))?;
    Ok(Json(detail))
}

/// Redirects back to the post whether the comment was stored or discarded
/// by the bot check.
pub async fn post_comment(
    State(state): State<AppState>,
    uri: OriginalUri,
    CurrentViewer(viewer): CurrentViewer,
    Path(newspost_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> ApiResult<Redirect> {
    let id = NewspostId(newspost_id);
    match state
        .news
        .submit_comment(&viewer, id, &form.comment_text, &form.bot_token)
        .await
        .map_err(gated(&uri))?
    {
        CommentSubmission::Created(comment) => {
            tracing::debug!(comment = %comment.id, "comment stored");
        }
        CommentSubmission::Discarded => {}
    }
    Ok(Redirect::to(&post_view_path(id)))
}
