//! API endpoint handlers module
//!
//! Contains all HTTP endpoint handler implementations.

pub mod auth;
pub mod health;
pub mod jobs;
pub mod users;
