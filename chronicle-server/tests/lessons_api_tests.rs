//! Integration tests for lesson endpoints
//!
//! Covers the premium gate, completion idempotence, recommendations and
//! administrative lesson creation.

mod helpers;

use axum::http::StatusCode;
use chronicle_common::db::Era;
use chronicle_server::services::catalog::{self, NewLesson};
use chronicle_server::services::progress;
use chronicle_server::RequestContext;
use helpers::{get, post, LessonSpec, TestApp, ADMIN_USERNAME};
use serde_json::{json, Value};

fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|lesson| lesson["id"].as_i64().unwrap())
        .collect()
}

// =============================================================================
// Access gate
// =============================================================================

#[tokio::test]
async fn test_free_lesson_visible_anonymously() {
    let app = TestApp::new().await;
    let lesson = app.lesson(LessonSpec::new("Pyramids", Era::Ancient, 10)).await;

    let (status, _, body) = app.send(get(&format!("/api/lessons/{}", lesson.id), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Pyramids");
    assert_eq!(body["estimatedMinutes"], 10);
    assert_eq!(body["content"], "The story of Pyramids");
}

#[tokio::test]
async fn test_premium_lesson_requires_subscription() {
    let app = TestApp::new().await;
    let lesson = app
        .lesson(LessonSpec::new("Magna Carta", Era::Medieval, 12).premium())
        .await;
    let uri = format!("/api/lessons/{}", lesson.id);

    let (status, _, body) = app.send(get(&uri, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["action"], "subscribe");

    let reader = app.user("reader").await;
    let token = app.login_as(&reader).await;
    let (status, _, _) = app.send(get(&uri, Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let patron = app.subscriber("patron").await;
    let token = app.login_as(&patron).await;
    let (status, _, body) = app.send(get(&uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isPremium"], true);
}

#[tokio::test]
async fn test_missing_lesson_is_not_found() {
    let app = TestApp::new().await;

    let (status, _, body) = app.send(get("/api/lessons/999", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_non_numeric_lesson_id_returns_json_error() {
    let app = TestApp::new().await;
    let user = app.user("scribe").await;
    let token = app.login_as(&user).await;

    let (status, _, body) = app.send(get("/api/lessons/rome", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "id");

    let (status, _, body) = app
        .send(post("/api/lessons/rome/complete", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "id");
}

#[tokio::test]
async fn test_list_marks_locked_lessons_and_omits_content() {
    let app = TestApp::new().await;
    let free = app.lesson(LessonSpec::new("Printing Press", Era::Modern, 9).day(1)).await;
    let premium = app
        .lesson(LessonSpec::new("Bastille", Era::Revolution, 14).premium().day(2))
        .await;

    let (status, _, body) = app.send(get("/api/lessons", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![premium.id, free.id]);
    assert_eq!(body[0]["locked"], true);
    assert_eq!(body[1]["locked"], false);
    assert!(body[0].get("content").is_none());

    let patron = app.subscriber("patron").await;
    let token = app.login_as(&patron).await;
    let (_, _, body) = app.send(get("/api/lessons", Some(&token))).await;
    assert_eq!(body[0]["locked"], false);
}

// =============================================================================
// Progress tracking
// =============================================================================

#[tokio::test]
async fn test_complete_twice_yields_single_row() {
    let app = TestApp::new().await;
    let lesson = app.lesson(LessonSpec::new("Hastings", Era::War, 10)).await;
    let user = app.user("reader").await;
    let token = app.login_as(&user).await;
    let uri = format!("/api/lessons/{}/complete", lesson.id);

    for _ in 0..2 {
        let (status, _, body) = app.send(post(&uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["progress"]["completed"], true);
    }

    assert_eq!(app.count("SELECT COUNT(*) FROM user_progress").await, 1);
    assert_eq!(
        app.count("SELECT COUNT(*) FROM user_progress WHERE completed = 1").await,
        1
    );

    let (_, _, achievements) = app.send(get("/api/achievements", Some(&token))).await;
    let achievements = achievements.as_array().unwrap();
    assert_eq!(achievements.len(), 1);
    assert_eq!(achievements[0]["kind"], "lesson_completed");
    assert_eq!(achievements[0]["details"]["lessonId"], lesson.id);
    assert_eq!(achievements[0]["details"]["era"], "war");
}

#[tokio::test]
async fn test_concurrent_completions_keep_one_row() {
    let app = TestApp::new().await;
    let lesson = app.lesson(LessonSpec::new("Marathon", Era::Ancient, 10)).await;
    let user = app.user("runner").await;
    let token = app.login_as(&user).await;
    let context = RequestContext::authenticated(user, token);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = app.pool.clone();
        let context = context.clone();
        let lesson_id = lesson.id;
        handles.push(tokio::spawn(async move {
            progress::record_completion(&pool, &context, lesson_id).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(app.count("SELECT COUNT(*) FROM user_progress").await, 1);
    assert_eq!(app.count("SELECT COUNT(*) FROM achievements").await, 1);
}

#[tokio::test]
async fn test_complete_requires_session_and_entitlement() {
    let app = TestApp::new().await;
    let premium = app
        .lesson(LessonSpec::new("Waterloo", Era::War, 10).premium())
        .await;
    let uri = format!("/api/lessons/{}/complete", premium.id);

    let (status, _, body) = app.send(post(&uri, None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTHENTICATION_REQUIRED");

    let reader = app.user("reader").await;
    let token = app.login_as(&reader).await;
    let (status, _, _) = app.send(post(&uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app
        .send(post("/api/lessons/4242/complete", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.count("SELECT COUNT(*) FROM user_progress").await, 0);
}

// =============================================================================
// Recommendations
// =============================================================================

#[tokio::test]
async fn test_recommendations_empty_without_history() {
    let app = TestApp::new().await;
    app.lesson(LessonSpec::new("Sparta", Era::Ancient, 10)).await;
    let user = app.user("newcomer").await;
    let token = app.login_as(&user).await;

    let (status, _, body) = app.send(get("/api/lessons/recommended", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_recommendations_follow_era_band_and_prerequisites() {
    let app = TestApp::new().await;
    let done = app.lesson(LessonSpec::new("Sumer", Era::Ancient, 10).day(0)).await;
    let plain = app.lesson(LessonSpec::new("Babylon", Era::Ancient, 8).day(5)).await;
    let sequel = app
        .lesson(LessonSpec::new("Akkad", Era::Ancient, 9).requires(&[done.id]).day(1))
        .await;
    let premium = app
        .lesson(LessonSpec::new("Ur", Era::Ancient, 11).premium().day(3))
        .await;
    app.lesson(LessonSpec::new("Crusades", Era::Medieval, 10).day(9)).await;
    app.lesson(LessonSpec::new("Long Ancient", Era::Ancient, 40).day(9)).await;

    let user = app.user("scribe").await;
    let token = app.login_as(&user).await;
    let (status, _, _) = app
        .send(post(&format!("/api/lessons/{}/complete", done.id), Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app.send(get("/api/lessons/recommended", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![sequel.id, plain.id, premium.id]);
    assert_eq!(body[2]["locked"], true);
}

#[tokio::test]
async fn test_recommendations_after_one_fifteen_minute_lesson() {
    let app = TestApp::new().await;
    let egypt = app.lesson(LessonSpec::new("Egypt", Era::Ancient, 15).day(0)).await;
    let nubia = app.lesson(LessonSpec::new("Nubia", Era::Ancient, 20).day(2)).await;
    let kush = app.lesson(LessonSpec::new("Kush", Era::Ancient, 15).day(1)).await;
    app.lesson(LessonSpec::new("Persia", Era::Ancient, 30).day(3)).await;
    app.lesson(LessonSpec::new("Byzantium", Era::Medieval, 15).day(4)).await;

    let user = app.user("pharaoh").await;
    let token = app.login_as(&user).await;
    let (status, _, _) = app
        .send(post(&format!("/api/lessons/{}/complete", egypt.id), Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = app.send(get("/api/lessons/recommended", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![nubia.id, kush.id]);
    for lesson in body.as_array().unwrap() {
        assert_eq!(lesson["era"], "ancient");
        let minutes = lesson["estimatedMinutes"].as_i64().unwrap();
        assert!((5..=25).contains(&minutes));
    }
}

#[tokio::test]
async fn test_recommendations_capped_at_five_and_exclude_completed() {
    let app = TestApp::new().await;
    let user = app.user("bookworm").await;
    let token = app.login_as(&user).await;

    let titles = [
        "Tudors", "Stuarts", "Plague", "Vikings", "Normans", "Saxons", "Franks", "Goths",
    ];
    let mut lessons = Vec::new();
    for (day, title) in titles.iter().enumerate() {
        lessons.push(
            app.lesson(LessonSpec::new(*title, Era::Medieval, 10).day(day as i64))
                .await,
        );
    }

    for lesson in &lessons[..2] {
        app.send(post(&format!("/api/lessons/{}/complete", lesson.id), Some(&token), None))
            .await;
    }

    let (_, _, body) = app.send(get("/api/lessons/recommended", Some(&token))).await;
    let recommended = ids(&body);

    assert_eq!(recommended.len(), 5);
    assert!(!recommended.contains(&lessons[0].id));
    assert!(!recommended.contains(&lessons[1].id));
    assert_eq!(recommended[0], lessons[7].id);
}

#[tokio::test]
async fn test_recommendations_require_session() {
    let app = TestApp::new().await;
    let (status, _, _) = app.send(get("/api/lessons/recommended", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Administrative creation and seeding
// =============================================================================

fn lesson_body() -> Value {
    json!({
        "title": "The Reformation",
        "description": "Luther and after",
        "content": "In 1517 ...",
        "era": "revolution",
        "isPremium": true,
        "estimatedMinutes": 15
    })
}

#[tokio::test]
async fn test_admin_creates_lesson() {
    let app = TestApp::new().await;
    let admin = app.user(ADMIN_USERNAME).await;
    let token = app.login_as(&admin).await;

    let (status, _, body) = app.send(post("/api/lessons", Some(&token), Some(lesson_body()))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "The Reformation");
    assert_eq!(body["era"], "revolution");
    assert_eq!(body["prerequisites"], json!([]));
    assert_eq!(app.count("SELECT COUNT(*) FROM lessons").await, 1);
}

#[tokio::test]
async fn test_lesson_creation_requires_admin() {
    let app = TestApp::new().await;

    let (status, _, _) = app.send(post("/api/lessons", None, Some(lesson_body()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let reader = app.user("reader").await;
    let token = app.login_as(&reader).await;
    let (status, _, _) = app.send(post("/api/lessons", Some(&token), Some(lesson_body()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(app.count("SELECT COUNT(*) FROM lessons").await, 0);
}

#[tokio::test]
async fn test_lesson_creation_rejects_unknown_field() {
    let app = TestApp::new().await;
    let admin = app.user(ADMIN_USERNAME).await;
    let token = app.login_as(&admin).await;

    let mut body = lesson_body();
    body["difficulty"] = json!("hard");
    let (status, _, body) = app.send(post("/api/lessons", Some(&token), Some(body))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "difficulty");
}

#[tokio::test]
async fn test_lesson_creation_rejects_missing_prerequisite() {
    let app = TestApp::new().await;
    let admin = app.user(ADMIN_USERNAME).await;
    let token = app.login_as(&admin).await;

    let mut body = lesson_body();
    body["prerequisites"] = json!([77]);
    let (status, _, body) = app.send(post("/api/lessons", Some(&token), Some(body))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "prerequisites");
}

#[tokio::test]
async fn test_seed_skips_existing_titles() {
    let app = TestApp::new().await;
    let existing = app.lesson(LessonSpec::new("Troy", Era::Ancient, 10)).await;

    let seed: Vec<NewLesson> = catalog::parse_seed(
        json!([
            {
                "title": "Troy", "description": "d", "content": "c",
                "era": "ancient", "estimatedMinutes": 10
            },
            {
                "title": "Carthage", "description": "d", "content": "c",
                "era": "ancient", "estimatedMinutes": 12, "prerequisites": [existing.id]
            }
        ])
        .to_string()
        .as_bytes(),
    )
    .unwrap();

    let report = catalog::seed_lessons(&app.pool, seed.clone()).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped, 1);

    let again = catalog::seed_lessons(&app.pool, seed).await.unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(app.count("SELECT COUNT(*) FROM lessons").await, 2);
}
