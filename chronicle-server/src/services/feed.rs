//! Social feed: posting, liking, saving

use chrono::Utc;
use chronicle_common::db::FeedPost;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::db;
use crate::error::{ApiError, ApiResult};

pub use crate::db::feed::NewPost;

pub const MAX_POST_TITLE_LEN: usize = 200;
pub const MAX_TAGS: usize = 10;

impl NewPost {
    pub fn validate(&self) -> ApiResult<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ApiError::validation("title", "Title must not be empty"));
        }
        if title.chars().count() > MAX_POST_TITLE_LEN {
            return Err(ApiError::validation(
                "title",
                format!("Title must be at most {} characters", MAX_POST_TITLE_LEN),
            ));
        }
        if self.content.trim().is_empty() {
            return Err(ApiError::validation("content", "Content must not be empty"));
        }
        if let Some(url) = &self.media_url {
            if url.trim().is_empty() {
                return Err(ApiError::validation("mediaUrl", "Media URL must not be blank"));
            }
        }
        if self.tags.len() > MAX_TAGS {
            return Err(ApiError::validation(
                "tags",
                format!("At most {} tags allowed", MAX_TAGS),
            ));
        }
        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(ApiError::validation("tags", "Tags must not be blank"));
        }
        Ok(())
    }
}

/// Result of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes: i64,
}

pub async fn create_post(
    pool: &SqlitePool,
    context: &RequestContext,
    post: NewPost,
) -> ApiResult<FeedPost> {
    let user = context.require_user()?;
    post.validate()?;

    let created = db::feed::insert_post(pool, user.id, &post, Utc::now()).await?;
    info!(post_id = created.id, author_id = user.id, "Feed post created");

    Ok(created)
}

/// Like the post if the viewer has not, otherwise unlike it
///
/// The join row and the cached counter change in one transaction, and the
/// delete runs first so the transaction holds the write lock from its
/// first statement.
pub async fn toggle_like(
    pool: &SqlitePool,
    context: &RequestContext,
    post_id: i64,
) -> ApiResult<LikeState> {
    let user = context.require_user()?;

    if db::feed::find_post(pool, post_id).await?.is_none() {
        return Err(ApiError::not_found("Post", post_id));
    }

    let mut tx = pool.begin().await?;

    let liked = if db::feed::delete_like(&mut *tx, user.id, post_id).await? == 1 {
        db::feed::adjust_likes(&mut *tx, post_id, -1).await?;
        false
    } else {
        let inserted = db::feed::insert_like(&mut *tx, user.id, post_id, Utc::now()).await?;
        if inserted == 1 {
            db::feed::adjust_likes(&mut *tx, post_id, 1).await?;
        }
        true
    };

    let likes = db::feed::likes_counter(&mut *tx, post_id).await?;
    tx.commit().await?;

    debug!(post_id, user_id = user.id, liked, likes, "Toggled like");
    Ok(LikeState { liked, likes })
}

/// Save a post for the viewer; saving twice is harmless
pub async fn save(pool: &SqlitePool, context: &RequestContext, post_id: i64) -> ApiResult<()> {
    let user = context.require_user()?;

    if db::feed::find_post(pool, post_id).await?.is_none() {
        return Err(ApiError::not_found("Post", post_id));
    }

    let newly_saved = db::feed::save_post(pool, user.id, post_id, Utc::now()).await?;
    debug!(post_id, user_id = user.id, newly_saved, "Saved post");

    Ok(())
}
