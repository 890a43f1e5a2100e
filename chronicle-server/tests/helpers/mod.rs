//! Shared fixtures for chronicle-server integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use chronicle_common::api::sign_payload;
use chronicle_common::db::{init_database, Era, Lesson, User};
use chronicle_server::db;
use chronicle_server::services::billing::{BillingError, BillingProvider, SubscriptionIntent};
use chronicle_server::services::catalog::NewLesson;
use chronicle_server::{build_router, AppState, ServerSettings};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const ADMIN_USERNAME: &str = "curator";

/// Billing provider that records calls instead of reaching a processor
#[derive(Default)]
pub struct FakeBilling {
    pub customers_created: AtomicUsize,
    pub subscriptions_created: AtomicUsize,
    /// Make `create_subscription` fail like an unreachable processor
    pub fail_subscriptions: AtomicBool,
}

#[async_trait]
impl BillingProvider for FakeBilling {
    async fn create_customer(&self, user: &User) -> Result<String, BillingError> {
        self.customers_created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("cus_test_{}", user.id))
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        _user: &User,
    ) -> Result<SubscriptionIntent, BillingError> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(BillingError::Network("connection refused".to_string()));
        }
        let n = self.subscriptions_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SubscriptionIntent {
            subscription_id: format!("sub_test_{}_{}", customer_id, n),
            client_secret: format!("pi_test_{}_secret", n),
        })
    }
}

pub struct TestApp {
    _dir: TempDir,
    pub pool: SqlitePool,
    pub billing: Arc<FakeBilling>,
    pub settings: ServerSettings,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("chronicle.db")).await.unwrap();

        let settings = ServerSettings {
            webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            admin_usernames: vec![ADMIN_USERNAME.to_string()],
            ..ServerSettings::default()
        };

        Self {
            _dir: dir,
            pool,
            billing: Arc::new(FakeBilling::default()),
            settings,
        }
    }

    pub fn router(&self) -> Router {
        let billing: Arc<dyn BillingProvider> = self.billing.clone();
        build_router(AppState::new(self.pool.clone(), billing, self.settings.clone()))
    }

    /// Send a request and decode the JSON body (`Null` when empty)
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    /// User with a placeholder password hash
    pub async fn user(&self, username: &str) -> User {
        db::users::create_user(&self.pool, username, "not-a-real-hash", Utc::now())
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn subscriber(&self, username: &str) -> User {
        let user = self.user(username).await;
        sqlx::query("UPDATE users SET is_subscribed = 1, subscription_status = 'active' WHERE id = ?")
            .bind(user.id)
            .execute(&self.pool)
            .await
            .unwrap();
        self.reload_user(user.id).await
    }

    pub async fn reload_user(&self, id: i64) -> User {
        db::users::find_by_id(&self.pool, id).await.unwrap().unwrap()
    }

    /// Session token for a user
    pub async fn login_as(&self, user: &User) -> String {
        db::sessions::create_session(&self.pool, user.id, Duration::hours(1), Utc::now())
            .await
            .unwrap()
            .token
    }

    pub async fn lesson(&self, spec: LessonSpec) -> Lesson {
        let new_lesson = NewLesson {
            title: spec.title.to_string(),
            description: format!("About {}", spec.title),
            content: format!("The story of {}", spec.title),
            era: spec.era,
            image_url: None,
            is_premium: spec.premium,
            estimated_minutes: spec.minutes,
            prerequisites: spec.prerequisites,
        };
        db::lessons::insert_lesson(&self.pool, &new_lesson, base_time() + Duration::days(spec.day))
            .await
            .unwrap()
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(&self.pool).await.unwrap()
    }
}

pub struct LessonSpec {
    pub title: &'static str,
    pub era: Era,
    pub minutes: i64,
    pub premium: bool,
    pub prerequisites: Vec<i64>,
    /// Creation time offset in days; larger is newer
    pub day: i64,
}

impl LessonSpec {
    pub fn new(title: &'static str, era: Era, minutes: i64) -> Self {
        Self {
            title,
            era,
            minutes,
            premium: false,
            prerequisites: Vec::new(),
            day: 0,
        }
    }

    pub fn premium(mut self) -> Self {
        self.premium = true;
        self
    }

    pub fn requires(mut self, ids: &[i64]) -> Self {
        self.prerequisites = ids.to_vec();
        self
    }

    pub fn day(mut self, day: i64) -> Self {
        self.day = day;
        self
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request("GET", uri, token, None)
}

pub fn post(uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    request("POST", uri, token, body)
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Webhook request signed with [`WEBHOOK_SECRET`] at the current time
pub fn signed_webhook(event: &Value) -> Request<Body> {
    let payload = event.to_string();
    let header = sign_payload(WEBHOOK_SECRET, Utc::now().timestamp(), payload.as_bytes()).unwrap();
    Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header("stripe-signature", header)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload))
        .unwrap()
}

/// Billing subscription event for a user
pub fn subscription_event(id: &str, event_type: &str, user_id: i64, status: &str, created: i64) -> Value {
    serde_json::json!({
        "id": id,
        "type": event_type,
        "created": created,
        "data": {
            "object": {
                "id": "sub_123",
                "status": status,
                "metadata": { "userId": user_id.to_string() }
            }
        }
    })
}

/// Session token from a `Set-Cookie` header
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookie = headers.get(header::SET_COOKIE)?.to_str().ok()?;
    let value = cookie.split(';').next()?.strip_prefix("chronicle_session=")?;
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
