//! Lesson catalog queries

use chrono::{DateTime, Utc};
use chronicle_common::db::{Era, Lesson};
use chronicle_common::Result;
use serde::Deserialize;
use sqlx::{Executor, Sqlite};

const LESSON_COLUMNS: &str = "l.id, l.title, l.description, l.content, l.era, l.image_url, \
     l.is_premium, l.estimated_minutes, l.prerequisites, l.created_at";

/// All lessons, newest first
pub async fn list_lessons<'e, E>(executor: E) -> Result<Vec<Lesson>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM lessons l ORDER BY l.created_at DESC, l.id DESC",
        LESSON_COLUMNS
    );
    let lessons = sqlx::query_as::<_, Lesson>(&sql).fetch_all(executor).await?;
    Ok(lessons)
}

pub async fn find_lesson<'e, E>(executor: E, id: i64) -> Result<Option<Lesson>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM lessons l WHERE l.id = ?", LESSON_COLUMNS);
    let lesson = sqlx::query_as::<_, Lesson>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(lesson)
}

/// Lessons the user has completed
pub async fn completed_lessons<'e, E>(executor: E, user_id: i64) -> Result<Vec<Lesson>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM user_progress p \
         JOIN lessons l ON l.id = p.lesson_id \
         WHERE p.user_id = ? AND p.completed = 1",
        LESSON_COLUMNS
    );
    let lessons = sqlx::query_as::<_, Lesson>(&sql)
        .bind(user_id)
        .fetch_all(executor)
        .await?;
    Ok(lessons)
}

/// Lesson as submitted by an administrator or a seed file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewLesson {
    pub title: String,
    pub description: String,
    pub content: String,
    pub era: Era,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    pub estimated_minutes: i64,
    #[serde(default)]
    pub prerequisites: Vec<i64>,
}

/// Insert a validated lesson
pub async fn insert_lesson<'e, E>(
    executor: E,
    lesson: &NewLesson,
    created_at: DateTime<Utc>,
) -> Result<Lesson>
where
    E: Executor<'e, Database = Sqlite>,
{
    let prerequisites = serde_json::to_string(&lesson.prerequisites)?;

    let inserted = sqlx::query_as::<_, Lesson>(
        r#"
        INSERT INTO lessons (
            title, description, content, era, image_url,
            is_premium, estimated_minutes, prerequisites, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, title, description, content, era, image_url,
                  is_premium, estimated_minutes, prerequisites, created_at
        "#,
    )
    .bind(&lesson.title)
    .bind(&lesson.description)
    .bind(&lesson.content)
    .bind(lesson.era.as_str())
    .bind(&lesson.image_url)
    .bind(lesson.is_premium)
    .bind(lesson.estimated_minutes)
    .bind(prerequisites)
    .bind(created_at)
    .fetch_one(executor)
    .await?;

    Ok(inserted)
}

/// How many of the given ids exist
pub async fn count_existing<'e, E>(executor: E, ids: &[i64]) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let ids_json = serde_json::to_string(ids)?;
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM lessons WHERE id IN (SELECT value FROM json_each(?))",
    )
    .bind(ids_json)
    .fetch_one(executor)
    .await?;
    Ok(count)
}

pub async fn title_exists<'e, E>(executor: E, title: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lessons WHERE title = ?)")
        .bind(title)
        .fetch_one(executor)
        .await?;
    Ok(exists)
}
