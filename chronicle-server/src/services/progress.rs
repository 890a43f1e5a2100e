//! Lesson completion tracking
//!
//! One progress row per (user, lesson). The insert runs first so that the
//! transaction takes the write lock immediately and the store's unique
//! constraint decides concurrent duplicates.

use chrono::Utc;
use chronicle_common::db::ProgressRecord;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::access_gate;
use crate::context::RequestContext;
use crate::db;
use crate::error::{ApiError, ApiResult};

/// Achievement kind appended on first completion
pub const LESSON_COMPLETED: &str = "lesson_completed";

/// Mark a lesson completed for the signed-in user
pub async fn record_completion(
    pool: &SqlitePool,
    context: &RequestContext,
    lesson_id: i64,
) -> ApiResult<ProgressRecord> {
    let user = context.require_user()?;

    let lesson = db::lessons::find_lesson(pool, lesson_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lesson", lesson_id))?;

    if !access_gate::can_view(&lesson, Some(user)) {
        return Err(ApiError::premium_required());
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let newly_completed = if db::progress::insert_completed(&mut *tx, user.id, lesson.id, now).await? {
        true
    } else {
        let existing = db::progress::find_progress(&mut *tx, user.id, lesson.id)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(format!(
                    "Progress row for user {} lesson {} vanished",
                    user.id, lesson.id
                ))
            })?;
        db::progress::mark_completed(&mut *tx, existing.id, now).await?;
        !existing.completed
    };

    if newly_completed {
        let details = json!({ "lessonId": lesson.id, "era": lesson.era });
        db::achievements::append_achievement(&mut *tx, user.id, LESSON_COMPLETED, &details, now)
            .await?;
    }

    let record = db::progress::find_progress(&mut *tx, user.id, lesson.id)
        .await?
        .ok_or_else(|| ApiError::Internal("Progress row missing after upsert".to_string()))?;

    tx.commit().await?;

    if newly_completed {
        info!(user_id = user.id, lesson_id = lesson.id, "Lesson completed");
    } else {
        debug!(user_id = user.id, lesson_id = lesson.id, "Lesson completion refreshed");
    }

    Ok(record)
}
