//! Data access layer
//!
//! One repository per aggregate, each a thin typed wrapper over the shared
//! pool. Queries are built at runtime so no live database is needed to
//! compile.

pub mod applications;
pub mod jobs;
pub mod users;

pub use applications::ApplicationRepository;
pub use jobs::JobRepository;
pub use users::UserRepository;

/// PostgreSQL SQLSTATE for unique-constraint violations.
pub(crate) const UNIQUE_VIOLATION: &str = "23505";

/// Whether a sqlx error is a unique-constraint violation (duplicate row).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
        }
        _ => false,
    }
}
