//! Business logic behind the HTTP handlers
//!
//! Handlers stay thin: they extract the request, call one service with the
//! explicit [`crate::RequestContext`], and serialize the result.

pub mod access_gate;
pub mod accounts;
pub mod billing;
pub mod catalog;
pub mod feed;
pub mod password;
pub mod progress;
pub mod recommender;
pub mod reconciler;
