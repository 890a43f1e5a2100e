//! Lesson recommendation engine
//!
//! Candidates share an era with something the user finished, are not
//! finished themselves, and fall inside a duration band centred on the
//! typical length of the lessons the user has completed. Lessons building
//! on a completed prerequisite rank first, then newer lessons.
//!
//! A user with no completions gets no recommendations.

use chronicle_common::db::{Era, Lesson};
use sqlx::SqlitePool;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

use crate::db;
use crate::error::ApiResult;

/// Maximum number of lessons returned
pub const MAX_RECOMMENDATIONS: usize = 5;
/// Band half-width around the centre, in minutes
pub const BAND_HALF_WIDTH: i64 = 10;
/// Lower floor of the band, in minutes
pub const MIN_BAND_MINUTES: i64 = 5;

/// Inclusive range of acceptable `estimated_minutes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationBand {
    pub min: i64,
    pub max: i64,
}

impl DurationBand {
    /// `[max(5, n - 10), n + 10]`
    pub fn around(n: i64) -> Self {
        Self {
            min: (n - BAND_HALF_WIDTH).max(MIN_BAND_MINUTES),
            max: n + BAND_HALF_WIDTH,
        }
    }

    /// Band centred on the rounded mean length of the completed lessons
    ///
    /// One completed 15 minute lesson gives `[5, 25]`.
    pub fn for_completed(completed: &[Lesson]) -> Self {
        let count = completed.len().max(1) as i64;
        let total: i64 = completed.iter().map(|lesson| lesson.estimated_minutes).sum();
        Self::around((total + count / 2) / count)
    }

    pub fn contains(&self, minutes: i64) -> bool {
        (self.min..=self.max).contains(&minutes)
    }
}

/// Rank catalog lessons for a user given the lessons they completed
pub fn recommend(completed: &[Lesson], catalog: &[Lesson]) -> Vec<Lesson> {
    let preferred_eras: HashSet<Era> = completed.iter().map(|lesson| lesson.era).collect();
    if preferred_eras.is_empty() {
        return Vec::new();
    }

    let completed_ids: HashSet<i64> = completed.iter().map(|lesson| lesson.id).collect();
    let band = DurationBand::for_completed(completed);

    let mut candidates: Vec<(bool, &Lesson)> = catalog
        .iter()
        .filter(|lesson| preferred_eras.contains(&lesson.era))
        .filter(|lesson| !completed_ids.contains(&lesson.id))
        .filter(|lesson| band.contains(lesson.estimated_minutes))
        .map(|lesson| {
            let boosted = lesson
                .prerequisites
                .iter()
                .any(|id| completed_ids.contains(id));
            (boosted, lesson)
        })
        .collect();

    candidates.sort_by(|(a_boost, a), (b_boost, b)| rank(*a_boost, a, *b_boost, b));

    candidates
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .map(|(_, lesson)| lesson.clone())
        .collect()
}

/// Boosted first, then newest, then highest id
fn rank(a_boost: bool, a: &Lesson, b_boost: bool, b: &Lesson) -> Ordering {
    b_boost
        .cmp(&a_boost)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// Load a user's history and the catalog, then rank
pub async fn recommend_for_user(pool: &SqlitePool, user_id: i64) -> ApiResult<Vec<Lesson>> {
    let completed = db::lessons::completed_lessons(pool, user_id).await?;
    if completed.is_empty() {
        debug!(user_id, "No completed lessons, nothing to recommend");
        return Ok(Vec::new());
    }

    let catalog = db::lessons::list_lessons(pool).await?;
    let recommendations = recommend(&completed, &catalog);

    debug!(
        user_id,
        completed = completed.len(),
        recommended = recommendations.len(),
        "Computed recommendations"
    );

    Ok(recommendations)
}
