//! Database module
//!
//! Contains the PostgreSQL pool setup, row models, and the data access layer.

pub mod models;
pub mod postgres;
pub mod repositories;

pub use models::{Application, Job, JobStats, JobType, User, UserRole};
pub use repositories::{ApplicationRepository, JobRepository, UserRepository};
