//! Database access layer for chronicle-server
//!
//! One module per table. Single-statement functions take any executor so
//! they work against the pool or inside a transaction.

pub mod achievements;
pub mod billing_events;
pub mod feed;
pub mod lessons;
pub mod progress;
pub mod sessions;
pub mod users;
