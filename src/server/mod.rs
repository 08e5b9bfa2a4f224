//! Server module
//!
//! Contains application state, routing, shutdown coordination, and server
//! initialization logic.

pub mod app;
pub mod routes;
pub mod shutdown;
pub mod state;

pub use app::App;
pub use routes::{create_router, API_PREFIX};
pub use shutdown::{ShutdownController, ShutdownReason};
pub use state::AppState;
