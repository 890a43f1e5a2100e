//! API module for shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY pure functions and shared types. No HTTP
//! framework dependencies; the server wraps these in Axum handlers.

pub mod signature;

pub use signature::{
    compute_signature, sign_payload, verify_signature, SignatureError, SignatureHeader,
    DEFAULT_TOLERANCE_SECS,
};
