//! # Chronicle Common Library
//!
//! Shared code for the Chronicle services including:
//! - Database initialization, schema and entity models
//! - Bootstrap configuration loading
//! - Billing webhook signature scheme
//! - Common error type

pub mod api;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
