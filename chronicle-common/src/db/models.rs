//! Database models
//!
//! Field names follow the column names; JSON output is camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Historical period a lesson belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    Ancient,
    Medieval,
    Modern,
    War,
    Revolution,
}

impl Era {
    pub const ALL: [Era; 5] = [
        Era::Ancient,
        Era::Medieval,
        Era::Modern,
        Era::War,
        Era::Revolution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Era::Ancient => "ancient",
            Era::Medieval => "medieval",
            Era::Modern => "modern",
            Era::War => "war",
            Era::Revolution => "revolution",
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Era {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Era::ALL
            .iter()
            .copied()
            .find(|era| era.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown era: {}", s)))
    }
}

impl TryFrom<String> for Era {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Authoritative entitlement flag, written only by the reconciler
    pub is_subscribed: bool,
    pub subscription_status: Option<String>,
    /// Event time (unix seconds) of the last applied billing event
    #[serde(skip_serializing)]
    pub subscription_event_at: Option<i64>,
    #[serde(skip_serializing)]
    pub billing_customer_id: Option<String>,
    #[serde(skip_serializing)]
    pub billing_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub era: Era,
    pub image_url: Option<String>,
    pub is_premium: bool,
    pub estimated_minutes: i64,
    #[sqlx(json)]
    pub prerequisites: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: i64,
    pub completed: bool,
    pub last_attempted: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub media_url: Option<String>,
    /// Cached count of `feed_likes` rows for this post
    pub likes: i64,
    #[sqlx(json)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    #[sqlx(json)]
    pub details: serde_json::Value,
    pub awarded_at: DateTime<Utc>,
}
