use axum::{extract::State, Extension, Json};
use chronicle_common::db::Achievement;

use crate::context::RequestContext;
use crate::error::ApiResult;
use crate::{db, AppState};

/// GET /api/achievements
pub async fn list_achievements(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> ApiResult<Json<Vec<Achievement>>> {
    let user = context.require_user()?;
    Ok(Json(db::achievements::list_for_user(&state.db, user.id).await?))
}
