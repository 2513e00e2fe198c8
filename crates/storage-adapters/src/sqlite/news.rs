//! Data mapping between the `newsposts`/`comments` tables and the domain models.

use async_trait::async_trait;
use domains::{
    AppError, Comment, CommentId, CommentRecord, NewComment, NewNewspost, NewsRepo, Newspost,
    NewspostId, Result, UserId,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{db_err, SqliteStore};

const NEWSPOST_COLUMNS: &str = "id, newspost_title_text, newspost_main_text, newspost_photo, \
     newspost_audio, newspost_video, pub_date, newspost_author";

const COMMENT_COLUMNS: &str = "c.id AS id, c.newspost_parent AS newspost_parent, \
     c.comment_parent AS comment_parent, c.comment_text AS comment_text, c.pub_date AS pub_date, \
     c.comment_author AS comment_author, c.approved_status AS approved_status";

fn row_to_newspost(row: &SqliteRow) -> std::result::Result<Newspost, sqlx::Error> {
    Ok(Newspost {
        id: NewspostId(row.try_get("id")?),
        newspost_title_text: row.try_get("newspost_title_text")?,
        newspost_main_text: row.try_get("newspost_main_text")?,
        newspost_photo: row.try_get("newspost_photo")?,
        newspost_audio: row.try_get("newspost_audio")?,
        newspost_video: row.try_get("newspost_video")?,
        pub_date: row.try_get("pub_date")?,
        newspost_author: row.try_get::<Option<i64>, _>("newspost_author")?.map(UserId),
    })
}

fn row_to_comment(row: &SqliteRow) -> std::result::Result<Comment, sqlx::Error> {
    Ok(Comment {
        id: CommentId(row.try_get("id")?),
        newspost_parent: NewspostId(row.try_get("newspost_parent")?),
        comment_parent: row.try_get::<Option<i64>, _>("comment_parent")?.map(CommentId),
        comment_text: row.try_get("comment_text")?,
        pub_date: row.try_get("pub_date")?,
        comment_author: row.try_get::<Option<i64>, _>("comment_author")?.map(UserId),
        approved_status: row.try_get("approved_status")?,
    })
}

#[async_trait]
impl NewsRepo for SqliteStore {
    async fn create_newspost(&self, post: NewNewspost) -> Result<Newspost> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO newsposts (newspost_title_text, newspost_main_text, newspost_photo, \
             newspost_audio, newspost_video, pub_date, newspost_author) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&post.title)
        .bind(&post.main_text)
        .bind(&post.photo)
        .bind(&post.audio)
        .bind(&post.video)
        .bind(post.pub_date)
        .bind(post.author.map(|a| a.0))
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Newspost {
            id: NewspostId(id),
            newspost_title_text: post.title,
            newspost_main_text: post.main_text,
            newspost_photo: post.photo,
            newspost_audio: post.audio,
            newspost_video: post.video,
            pub_date: post.pub_date,
            newspost_author: post.author,
        })
    }

    async fn get_newspost(&self, id: NewspostId) -> Result<Option<Newspost>> {
        let row = sqlx::query(&format!("SELECT {NEWSPOST_COLUMNS} FROM newsposts WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(row_to_newspost).transpose().map_err(db_err)
    }

    async fn list_newsposts(&self, limit: u32) -> Result<Vec<Newspost>> {
        sqlx::query(&format!(
            "SELECT {NEWSPOST_COLUMNS} FROM newsposts ORDER BY pub_date DESC, id DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(row_to_newspost)
        .collect::<std::result::Result<_, _>>()
        .map_err(db_err)
    }

    async fn delete_newspost(&self, id: NewspostId) -> Result<bool> {
        let done = sqlx::query("DELETE FROM newsposts WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(done.rows_affected() > 0)
    }

    /// Replies must stay on their parent's newspost; the check and the insert
    /// share one transaction.
    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        if let Some(parent) = comment.parent {
            let parent_post: Option<i64> =
                sqlx::query_scalar("SELECT newspost_parent FROM comments WHERE id = ?")
                    .bind(parent.0)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(db_err)?;
            match parent_post {
                None => return Err(AppError::not_found(format!("comment {parent}"))),
                Some(post) if post != comment.newspost.0 => {
                    return Err(AppError::ValidationFailed(format!(
                        "comment {parent} belongs to another newspost"
                    )));
                }
                Some(_) => {}
            }
        }

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO comments (newspost_parent, comment_parent, comment_text, pub_date, comment_author, approved_status) \
             VALUES (?, ?, ?, ?, ?, 0) RETURNING id",
        )
        .bind(comment.newspost.0)
        .bind(comment.parent.map(|p| p.0))
        .bind(&comment.text)
        .bind(comment.pub_date)
        .bind(comment.author.map(|a| a.0))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(Comment {
            id: CommentId(id),
            newspost_parent: comment.newspost,
            comment_parent: comment.parent,
            comment_text: comment.text,
            pub_date: comment.pub_date,
            comment_author: comment.author,
            approved_status: false,
        })
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        let row = sqlx::query(&format!("SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(row_to_comment).transpose().map_err(db_err)
    }

    async fn list_approved_comments(&self, post: NewspostId) -> Result<Vec<CommentRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS}, u.username AS author_username \
             FROM comments c LEFT JOIN users u ON u.id = c.comment_author \
             WHERE c.newspost_parent = ? AND c.approved_status = 1 \
             ORDER BY c.pub_date ASC, c.id ASC"
        ))
        .bind(post.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| -> std::result::Result<CommentRecord, sqlx::Error> {
                Ok(CommentRecord {
                    comment: row_to_comment(row)?,
                    author_username: row.try_get("author_username")?,
                })
            })
            .collect::<std::result::Result<_, sqlx::Error>>()
            .map_err(db_err)
    }

    async fn list_comments(&self, post: NewspostId) -> Result<Vec<Comment>> {
        sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.newspost_parent = ? ORDER BY c.pub_date ASC, c.id ASC"
        ))
        .bind(post.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(row_to_comment)
        .collect::<std::result::Result<_, _>>()
        .map_err(db_err)
    }

    async fn approve_comment(&self, id: CommentId) -> Result<bool> {
        let done = sqlx::query("UPDATE comments SET approved_status = 1 WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if done.rows_affected() > 0 {
            tracing::info!(comment = %id, "comment approved");
        }
        Ok(done.rows_affected() > 0)
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool> {
        let done = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn new_post(title: &str, minutes: i64) -> NewNewspost {
        NewNewspost {
            title: title.into(),
            main_text: format!("{title} body"),
            photo: None,
            audio: None,
            video: None,
            pub_date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes),
            author: None,
        }
    }

    fn new_comment(post: NewspostId, parent: Option<CommentId>, text: &str) -> NewComment {
        NewComment {
            newspost: post,
            parent,
            text: text.into(),
            pub_date: Utc::now(),
            author: None,
        }
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_truncates() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.create_newspost(new_post("old", 0)).await.unwrap();
        store.create_newspost(new_post("newest", 20)).await.unwrap();
        store.create_newspost(new_post("middle", 10)).await.unwrap();

        let titles: Vec<_> = store
            .list_newsposts(2)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.newspost_title_text)
            .collect();
        assert_eq!(titles, ["newest", "middle"]);
    }

    #[tokio::test]
    async fn test_new_comments_start_unapproved_and_approval_is_visible() {
        let store = SqliteStore::in_memory().await.unwrap();
        let post = store.create_newspost(new_post("p", 0)).await.unwrap();
        let c = store.create_comment(new_comment(post.id, None, "hi")).await.unwrap();
        assert!(!c.approved_status);
        assert!(store.list_approved_comments(post.id).await.unwrap().is_empty());

        assert!(store.approve_comment(c.id).await.unwrap());
        let visible = store.list_approved_comments(post.id).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].author_username, None);
        assert!(!store.approve_comment(CommentId(999)).await.unwrap());
    }

    #[tokio::test]
    async fn test_reply_to_comment_on_other_post_is_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        let a = store.create_newspost(new_post("a", 0)).await.unwrap();
        let b = store.create_newspost(new_post("b", 1)).await.unwrap();
        let on_a = store.create_comment(new_comment(a.id, None, "root")).await.unwrap();

        let err = store
            .create_comment(new_comment(b.id, Some(on_a.id), "stray"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));

        let reply = store
            .create_comment(new_comment(a.id, Some(on_a.id), "reply"))
            .await
            .unwrap();
        assert_eq!(reply.comment_parent, Some(on_a.id));
        assert!(store.list_comments(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_newspost_is_none() {
        let store = SqliteStore::in_memory().await.unwrap();
        assert_eq!(store.get_newspost(NewspostId(1)).await.unwrap(), None);
        assert_eq!(store.get_comment(CommentId(1)).await.unwrap(), None);
    }
}
