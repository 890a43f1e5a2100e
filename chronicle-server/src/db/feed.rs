//! Feed post, like and save queries

use chrono::{DateTime, Utc};
use chronicle_common::db::FeedPost;
use chronicle_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedAuthor {
    pub id: i64,
    pub username: String,
}

/// Post with its author, as listed in the feed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPostView {
    #[serde(flatten)]
    pub post: FeedPost,
    pub author: FeedAuthor,
}

#[derive(FromRow)]
struct FeedPostRow {
    #[sqlx(flatten)]
    post: FeedPost,
    author_username: String,
}

impl From<FeedPostRow> for FeedPostView {
    fn from(row: FeedPostRow) -> Self {
        let author = FeedAuthor {
            id: row.post.author_id,
            username: row.author_username,
        };
        Self {
            post: row.post,
            author,
        }
    }
}

const POST_COLUMNS: &str =
    "p.id, p.author_id, p.title, p.content, p.media_url, p.likes, p.tags, p.created_at";

/// All posts with authors, newest first
pub async fn list_posts<'e, E>(executor: E) -> Result<Vec<FeedPostView>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {}, u.username AS author_username FROM feed_posts p \
         JOIN users u ON u.id = p.author_id \
         ORDER BY p.created_at DESC, p.id DESC",
        POST_COLUMNS
    );
    let rows = sqlx::query_as::<_, FeedPostRow>(&sql)
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(FeedPostView::from).collect())
}

/// Posts a user saved, most recently saved first
pub async fn saved_posts<'e, E>(executor: E, user_id: i64) -> Result<Vec<FeedPostView>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {}, u.username AS author_username FROM user_saved_posts s \
         JOIN feed_posts p ON p.id = s.post_id \
         JOIN users u ON u.id = p.author_id \
         WHERE s.user_id = ? \
         ORDER BY s.created_at DESC, s.id DESC",
        POST_COLUMNS
    );
    let rows = sqlx::query_as::<_, FeedPostRow>(&sql)
        .bind(user_id)
        .fetch_all(executor)
        .await?;
    Ok(rows.into_iter().map(FeedPostView::from).collect())
}

pub async fn find_post<'e, E>(executor: E, post_id: i64) -> Result<Option<FeedPost>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM feed_posts p WHERE p.id = ?", POST_COLUMNS);
    let post = sqlx::query_as::<_, FeedPost>(&sql)
        .bind(post_id)
        .fetch_optional(executor)
        .await?;
    Ok(post)
}

/// Post as submitted by its author
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub async fn insert_post<'e, E>(
    executor: E,
    author_id: i64,
    post: &NewPost,
    created_at: DateTime<Utc>,
) -> Result<FeedPost>
where
    E: Executor<'e, Database = Sqlite>,
{
    let tags = serde_json::to_string(&post.tags)?;

    let inserted = sqlx::query_as::<_, FeedPost>(
        r#"
        INSERT INTO feed_posts (author_id, title, content, media_url, likes, tags, created_at)
        VALUES (?, ?, ?, ?, 0, ?, ?)
        RETURNING id, author_id, title, content, media_url, likes, tags, created_at
        "#,
    )
    .bind(author_id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.media_url)
    .bind(tags)
    .bind(created_at)
    .fetch_one(executor)
    .await?;

    Ok(inserted)
}

/// Remove a like row; returns rows removed (0 or 1)
pub async fn delete_like<'e, E>(executor: E, user_id: i64, post_id: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM feed_likes WHERE user_id = ? AND post_id = ?")
        .bind(user_id)
        .bind(post_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Add a like row; returns rows inserted (0 when already present)
pub async fn insert_like<'e, E>(
    executor: E,
    user_id: i64,
    post_id: i64,
    now: DateTime<Utc>,
) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO feed_likes (user_id, post_id, created_at) VALUES (?, ?, ?) \
         ON CONFLICT(user_id, post_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(post_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Atomic in-store counter adjustment
pub async fn adjust_likes<'e, E>(executor: E, post_id: i64, delta: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE feed_posts SET likes = likes + ? WHERE id = ?")
        .bind(delta)
        .bind(post_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Cached counter value
pub async fn likes_counter<'e, E>(executor: E, post_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let likes: i64 = sqlx::query_scalar("SELECT likes FROM feed_posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(executor)
        .await?;
    Ok(likes)
}

/// Number of like rows for a post
pub async fn like_rows<'e, E>(executor: E, post_id: i64) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feed_likes WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Save a post for a user; `true` when newly saved
pub async fn save_post<'e, E>(
    executor: E,
    user_id: i64,
    post_id: i64,
    now: DateTime<Utc>,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO user_saved_posts (user_id, post_id, created_at) VALUES (?, ?, ?) \
         ON CONFLICT(user_id, post_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(post_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}
