//! Lesson catalog writes: administrative creation and seeding
//!
//! Both paths go through [`NewLesson::validate`]. Unknown JSON fields are
//! rejected so a typo never silently drops data.

use chrono::Utc;
use chronicle_common::db::{Lesson, User};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::settings::ServerSettings;

pub use crate::db::lessons::NewLesson;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_ESTIMATED_MINUTES: i64 = 600;

impl NewLesson {
    /// Field-level checks that need no store access
    pub fn validate(&self) -> ApiResult<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ApiError::validation("title", "Title must not be empty"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ApiError::validation(
                "title",
                format!("Title must be at most {} characters", MAX_TITLE_LEN),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(ApiError::validation("description", "Description must not be empty"));
        }
        if self.content.trim().is_empty() {
            return Err(ApiError::validation("content", "Content must not be empty"));
        }
        if self.estimated_minutes <= 0 || self.estimated_minutes > MAX_ESTIMATED_MINUTES {
            return Err(ApiError::validation(
                "estimatedMinutes",
                format!("Estimated minutes must be between 1 and {}", MAX_ESTIMATED_MINUTES),
            ));
        }
        if let Some(url) = &self.image_url {
            if url.trim().is_empty() {
                return Err(ApiError::validation("imageUrl", "Image URL must not be blank"));
            }
        }

        let mut seen = HashSet::new();
        for id in &self.prerequisites {
            if *id <= 0 {
                return Err(ApiError::validation(
                    "prerequisites",
                    format!("Invalid lesson id {}", id),
                ));
            }
            if !seen.insert(*id) {
                return Err(ApiError::validation(
                    "prerequisites",
                    format!("Duplicate prerequisite {}", id),
                ));
            }
        }

        Ok(())
    }
}

/// Parse a request body into a [`NewLesson`], naming the offending field
pub fn parse_new_lesson(body: &[u8]) -> ApiResult<NewLesson> {
    serde_json::from_slice(body).map_err(json_validation_error)
}

/// Parse a seed file: a JSON array of lessons
pub fn parse_seed(body: &[u8]) -> ApiResult<Vec<NewLesson>> {
    serde_json::from_slice(body).map_err(json_validation_error)
}

/// The only enum in a lesson is its era
fn json_validation_error(err: serde_json::Error) -> ApiError {
    if err.to_string().starts_with("unknown variant") {
        return ApiError::Validation {
            field: Some("era".to_string()),
            message: err.to_string(),
        };
    }
    ApiError::invalid_json(err)
}

async fn ensure_prerequisites_exist(pool: &SqlitePool, lesson: &NewLesson) -> ApiResult<()> {
    if lesson.prerequisites.is_empty() {
        return Ok(());
    }
    let found = db::lessons::count_existing(pool, &lesson.prerequisites).await?;
    if found as usize != lesson.prerequisites.len() {
        return Err(ApiError::validation(
            "prerequisites",
            "Prerequisites reference lessons that do not exist",
        ));
    }
    Ok(())
}

/// Signed-in user listed in `admin.usernames`
pub fn require_admin<'a>(
    settings: &ServerSettings,
    context: &'a RequestContext,
) -> ApiResult<&'a User> {
    let user = context.require_user()?;
    if !settings.is_admin(&user.username) {
        return Err(ApiError::forbidden("Administrator role required"));
    }
    Ok(user)
}

/// Create a lesson on behalf of an administrator
pub async fn create_lesson(
    pool: &SqlitePool,
    settings: &ServerSettings,
    context: &RequestContext,
    lesson: NewLesson,
) -> ApiResult<Lesson> {
    let user = require_admin(settings, context)?;

    lesson.validate()?;
    ensure_prerequisites_exist(pool, &lesson).await?;

    let created = db::lessons::insert_lesson(pool, &lesson, Utc::now()).await?;
    info!(lesson_id = created.id, admin = %user.username, "Lesson created");

    Ok(created)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Load lessons in order, skipping titles already in the catalog
///
/// Later entries may list earlier ones as prerequisites.
pub async fn seed_lessons(pool: &SqlitePool, lessons: Vec<NewLesson>) -> ApiResult<SeedReport> {
    let mut report = SeedReport::default();

    for (index, lesson) in lessons.into_iter().enumerate() {
        lesson.validate().map_err(|err| match err {
            ApiError::Validation { field, message } => ApiError::Validation {
                field,
                message: format!("Lesson #{}: {}", index, message),
            },
            other => other,
        })?;

        if db::lessons::title_exists(pool, &lesson.title).await? {
            debug!(title = %lesson.title, "Seed lesson already present");
            report.skipped += 1;
            continue;
        }

        ensure_prerequisites_exist(pool, &lesson).await?;
        db::lessons::insert_lesson(pool, &lesson, Utc::now()).await?;
        report.inserted += 1;
    }

    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        "Seeded lesson catalog"
    );

    Ok(report)
}
