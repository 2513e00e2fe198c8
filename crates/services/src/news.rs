//! # Post/Comment Service
//!
//! Read paths for newsposts and their approved comment threads, plus
//! comment submission behind the bot check.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    AppError, BotVerifier, Comment, CommentView, NewComment, NewsRepo, Newspost, NewspostId,
    Result, Viewer, MAX_TEXT_LEN,
};
use serde::Serialize;

use crate::access::{self, require};

/// A newspost with the comments a reader is allowed to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDetail {
    #[serde(rename = "p")]
    pub post: Newspost,
    #[serde(rename = "comment_list")]
    pub comments: Vec<CommentView>,
}

/// Outcome of a comment submission. Either way the caller goes back to the
/// post view; a discarded submission is not reported as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentSubmission {
    Created(Comment),
    Discarded,
}

pub struct NewsService {
    news: Arc<dyn NewsRepo>,
    verifier: Arc<dyn BotVerifier>,
}

impl NewsService {
    pub fn new(news: Arc<dyn NewsRepo>, verifier: Arc<dyn BotVerifier>) -> Self {
        Self { news, verifier }
    }

    /// Newest posts for the public home page. No posts is a normal outcome.
    pub async fn list_recent_posts(&self, limit: u32) -> Result<Vec<Newspost>> {
        self.news.list_newsposts(limit).await
    }

    /// Newest posts for the members listing. Unlike the home page, an empty
    /// store is reported as `NotFound`.
    pub async fn list_posts(&self, viewer: &Viewer, limit: u32) -> Result<Vec<Newspost>> {
        access::authorize(viewer, access::LIST_POSTS)?;
        let posts = self.news.list_newsposts(limit).await?;
        if posts.is_empty() {
            return Err(AppError::not_found("newsposts"));
        }
        Ok(posts)
    }

    pub async fn get_post(&self, id: NewspostId) -> Result<Newspost> {
        self.news
            .get_newspost(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("newspost {id}")))
    }

    /// Approved comments on `id`, oldest first. Deleted authors render as a
    /// placeholder name.
    pub async fn get_approved_comments(&self, id: NewspostId) -> Result<Vec<CommentView>> {
        let records = self.news.list_approved_comments(id).await?;
        Ok(records.into_iter().map(CommentView::from).collect())
    }

    /// A single post as rendered for members.
    pub async fn view_post(&self, viewer: &Viewer, id: NewspostId) -> Result<PostDetail> {
        access::authorize(viewer, access::VIEW_POST)?;
        let post = self.get_post(id).await?;
        let comments = self.get_approved_comments(id).await?;
        Ok(PostDetail { post, comments })
    }

    /// Creates an unapproved top-level comment authored by the viewer.
    ///
    /// A failed bot check silently discards the submission.
    pub async fn submit_comment(
        &self,
        viewer: &Viewer,
        id: NewspostId,
        text: &str,
        bot_token: &str,
    ) -> Result<CommentSubmission> {
        let identity = require(viewer, access::SUBMIT_COMMENT)?;

        if !self.verifier.verify(bot_token).await {
            tracing::info!(user = %identity.user.id, newspost = %id, "bot check failed, comment discarded");
            return Ok(CommentSubmission::Discarded);
        }

        let post = self.get_post(id).await?;

        let text = text.trim();
        if text.is_empty() || text.chars().count() > MAX_TEXT_LEN {
            return Err(AppError::ValidationFailed(format!(
                "comment text must be between 1 and {MAX_TEXT_LEN} characters"
            )));
        }

        let comment = self
            .news
            .create_comment(NewComment {
                newspost: post.id,
                parent: None,
                text: text.to_string(),
                pub_date: Utc::now(),
                author: Some(identity.user.id),
            })
            .await?;

        tracing::info!(comment = %comment.id, newspost = %post.id, user = %identity.user.id, "comment submitted for moderation");
        Ok(CommentSubmission::Created(comment))
    }
}
