//! Lesson catalog, recommendation and completion endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use chronicle_common::db::{Era, Lesson};
use serde::Serialize;
use serde_json::{json, Value};

use super::IdPath;
use crate::context::RequestContext;
use crate::error::{ApiError, ApiResult};
use crate::services::{access_gate, catalog, progress, recommender};
use crate::{db, AppState};

/// Lesson without its body, as listed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub era: Era,
    pub image_url: Option<String>,
    pub is_premium: bool,
    pub estimated_minutes: i64,
    pub prerequisites: Vec<i64>,
    pub created_at: DateTime<Utc>,
    /// The viewer would be refused when opening it
    pub locked: bool,
}

impl LessonSummary {
    fn for_viewer(lesson: Lesson, context: &RequestContext) -> Self {
        let locked = !access_gate::can_view(&lesson, context.viewer());
        Self {
            id: lesson.id,
            title: lesson.title,
            description: lesson.description,
            era: lesson.era,
            image_url: lesson.image_url,
            is_premium: lesson.is_premium,
            estimated_minutes: lesson.estimated_minutes,
            prerequisites: lesson.prerequisites,
            created_at: lesson.created_at,
            locked,
        }
    }
}

/// GET /api/lessons
pub async fn list_lessons(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<Vec<LessonSummary>>> {
    let lessons = db::lessons::list_lessons(&state.db).await?;
    let summaries = lessons
        .into_iter()
        .map(|lesson| LessonSummary::for_viewer(lesson, &context))
        .collect();
    Ok(Json(summaries))
}

/// GET /api/lessons/:id
pub async fn get_lesson(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    IdPath(id): IdPath,
) -> ApiResult<Json<Lesson>> {
    let lesson = db::lessons::find_lesson(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lesson", id))?;

    if !access_gate::can_view(&lesson, context.viewer()) {
        return Err(ApiError::premium_required());
    }

    Ok(Json(lesson))
}

/// GET /api/lessons/recommended
pub async fn recommended_lessons(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<Vec<LessonSummary>>> {
    let user = context.require_user()?;
    let lessons = recommender::recommend_for_user(&state.db, user.id).await?;
    let summaries = lessons
        .into_iter()
        .map(|lesson| LessonSummary::for_viewer(lesson, &context))
        .collect();
    Ok(Json(summaries))
}

/// POST /api/lessons/:id/complete
pub async fn complete_lesson(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    IdPath(id): IdPath,
) -> ApiResult<Json<Value>> {
    let record = progress::record_completion(&state.db, &context, id).await?;
    Ok(Json(json!({ "success": true, "progress": record })))
}

/// POST /api/lessons
pub async fn create_lesson(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Lesson>)> {
    catalog::require_admin(&state.settings, &context)?;
    let new_lesson = catalog::parse_new_lesson(&body)?;
    let lesson = catalog::create_lesson(&state.db, &state.settings, &context, new_lesson).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}
