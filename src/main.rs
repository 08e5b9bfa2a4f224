//! Jobboard API
//!
//! REST API server for a job-board application: accounts, job postings,
//! and applications, behind a fixed middleware pipeline.

use anyhow::Result;
use clap::Parser;
use jobboard::{
    config::{Environment, Settings},
    server::App,
};

/// Jobboard API
///
/// REST API server for a job-board application.
#[derive(Parser, Debug)]
#[command(name = "jobboard")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT env var)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST env var)
    #[arg(long)]
    host: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Environment: dev, staging, prod (overrides ENVIRONMENT env var)
    #[arg(short, long)]
    env: Option<Environment>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::load()?;

    // Override settings with CLI arguments
    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(env) = args.env {
        settings.environment = env;
    }

    // Synchronous faults terminate the process immediately, with no drain.
    install_panic_hook();

    init_tracing(&settings);

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        host = %settings.host,
        port = %settings.port,
        "Starting application"
    );

    // Build the application; a dead database fails startup here.
    let app = App::new(settings).await?;

    // Run the server with graceful shutdown
    app.run_with_graceful_shutdown().await?;

    tracing::info!("Application shutdown complete");

    Ok(())
}

/// Install the process-wide handler for fatal synchronous faults.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("ERROR: {}", info);
        eprintln!("Shutting down due to uncaught panic.");
        std::process::exit(1);
    }));
}

/// Initialize the tracing subscriber: JSON output in production, human
/// readable elsewhere. `RUST_LOG` wins over the configured log level.
fn init_tracing(settings: &Settings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level));

    if settings.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
