//! Application server
//!
//! This module provides the main application server implementation
//! including initialization and graceful shutdown handling.

use anyhow::Result;
use std::net::SocketAddr;
use tokio::signal;

use crate::server::{
    routes,
    shutdown::{ShutdownController, ShutdownReason},
    state::AppState,
};

/// Main application struct
pub struct App {
    state: AppState,
}

impl App {
    /// Create a new application instance.
    ///
    /// Connects the database (startup fails if it is unreachable) and
    /// prepares the application for running.
    pub async fn new(settings: crate::config::Settings) -> Result<Self> {
        tracing::debug!("Initializing application state");
        let state = AppState::new(settings).await?;

        Ok(Self { state })
    }

    /// Run the server with graceful shutdown support.
    ///
    /// The server drains and stops on SIGINT/SIGTERM. A fatal asynchronous
    /// fault reported through the shutdown controller also drains, after
    /// which this function returns an error so the process exits non-zero.
    pub async fn run_with_graceful_shutdown(self) -> Result<()> {
        let settings = self.state.settings.clone();
        let shutdown = self.state.shutdown.clone();
        let router = routes::create_router(self.state.clone());

        let addr = settings.server_addr().parse::<SocketAddr>()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!(
            port = settings.port,
            environment = %settings.environment,
            "Server started on port {} in {} mode",
            settings.port,
            settings.environment
        );

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(wait_for_shutdown(shutdown.clone()))
        .await?;

        self.cleanup().await;

        if let Some(ShutdownReason::Fatal(reason)) = shutdown.reason() {
            anyhow::bail!("shut down after fatal error: {}", reason);
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Cleanup application resources
    async fn cleanup(&self) {
        tracing::info!("Closing database pool");
        self.state.pool.close().await;
    }

    /// Get a reference to the application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Resolve when the server should stop accepting connections: on an OS
/// signal or on a fatal fault reported through the controller.
async fn wait_for_shutdown(shutdown: ShutdownController) {
    tokio::select! {
        _ = shutdown_signal() => {
            shutdown.trigger(ShutdownReason::Signal);
            tracing::info!("Draining connections before exit");
        }
        reason = shutdown.triggered() => {
            match reason {
                ShutdownReason::Fatal(message) => {
                    tracing::error!(error = %message, "Fatal error, draining connections before exit");
                }
                ShutdownReason::Signal => {
                    tracing::info!("Draining connections before exit");
                }
            }
        }
    }
}

/// Create a future that completes when a shutdown signal is received
async fn shutdown_signal() {
    #[cfg(unix)]
    let sigterm = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        result = signal::ctrl_c() => {
            result.expect("Failed to install Ctrl+C handler");
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = sigterm => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
