//! Error types
//!
//! Contains the terminal API error type every request-level fault flows into.

pub mod types;

pub use types::ApiError;
