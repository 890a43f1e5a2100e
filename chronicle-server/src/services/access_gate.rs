//! Premium content gate

use chronicle_common::db::{Lesson, User};

/// Whether `viewer` may open `lesson`
///
/// Free lessons are visible to everyone. Premium lessons require a viewer
/// whose subscription flag is set.
pub fn can_view(lesson: &Lesson, viewer: Option<&User>) -> bool {
    if !lesson.is_premium {
        return true;
    }
    viewer.map(|user| user.is_subscribed).unwrap_or(false)
}
