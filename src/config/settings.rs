//! Application settings and configuration
//!
//! Settings load from environment variables (with `.env` support) into one
//! typed, validated struct that is passed explicitly to the application
//! constructor.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Runtime mode of the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => anyhow::bail!(
                "Invalid environment '{}': expected development, staging, or production",
                other
            ),
        }
    }
}

/// Rate limiting configuration: `max_requests` per `window_seconds` per
/// client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // 100 requests per 10 minutes per client
        Self {
            enabled: true,
            max_requests: 100,
            window_seconds: 600,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // Server settings
    pub host: String,
    pub port: u16,

    // Database
    #[serde(skip_serializing)]
    pub database_url: String,
    pub database_max_connections: u32,

    // Authentication
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expires_days: i64,
    pub cookie_expires_days: i64,

    // Rate limiting
    pub rate_limit: RateLimitConfig,

    // Static assets and uploads
    pub static_dir: String,
    pub upload_dir: String,
    pub max_upload_bytes: usize,

    // Request body cap applied before any handler runs
    pub max_body_bytes: usize,
}

/// Fallback JWT secret for local development only.
const DEV_JWT_SECRET: &str = "insecure-dev-secret";

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignored in production typically)
        dotenvy::dotenv().ok();

        let settings = Self {
            app_name: env_or("APP_NAME", "jobboard-api"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: env_parse("ENVIRONMENT", Environment::Development),
            log_level: env_or("LOG_LEVEL", "info"),

            host: env_or("HOST", "0.0.0.0"),
            port: env_or("PORT", "3000")
                .parse()
                .context("Invalid PORT value")?,

            database_url: env_or("DATABASE_URL", "postgres://localhost:5432/jobboard"),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),

            jwt_secret: env_or("JWT_SECRET", DEV_JWT_SECRET),
            jwt_expires_days: env_parse("JWT_EXPIRES_DAYS", 7),
            cookie_expires_days: env_parse("COOKIE_EXPIRES_DAYS", 7),

            rate_limit: RateLimitConfig {
                enabled: env_parse("RATE_LIMIT_ENABLED", true),
                max_requests: env_parse("RATE_LIMIT_MAX_REQUESTS", 100),
                window_seconds: env_parse("RATE_LIMIT_WINDOW_SECONDS", 600),
            },

            static_dir: env_or("STATIC_DIR", "public"),
            upload_dir: env_or("UPLOAD_DIR", "public/uploads"),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", 2 * 1024 * 1024),
            max_body_bytes: env_parse("MAX_BODY_BYTES", 1024 * 1024),
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL must not be empty");
        }

        if self.rate_limit.enabled {
            if self.rate_limit.max_requests == 0 {
                anyhow::bail!("Rate limit max_requests must be > 0");
            }
            if self.rate_limit.window_seconds == 0 {
                anyhow::bail!("Rate limit window_seconds must be > 0");
            }
        }

        if self.jwt_expires_days <= 0 {
            anyhow::bail!("JWT_EXPIRES_DAYS must be > 0");
        }

        if self.environment == Environment::Production && self.jwt_secret == DEV_JWT_SECRET {
            tracing::warn!("Running in production with the default JWT secret!");
        }

        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// The host:port string the listener binds to.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "jobboard-api".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: "postgres://localhost:5432/jobboard".to_string(),
            database_max_connections: 10,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expires_days: 7,
            cookie_expires_days: 7,
            rate_limit: RateLimitConfig::default(),
            static_dir: "public".to_string(),
            upload_dir: "public/uploads".to_string(),
            max_upload_bytes: 2 * 1024 * 1024,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Environment variable with a string default.
fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Environment variable parsed into `T`; unset or unparseable values fall
/// back to the default.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "jobboard-api");
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.rate_limit.max_requests, 100);
        assert_eq!(settings.rate_limit.window_seconds, 600);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(
            "development".parse::<Environment>().unwrap(),
            Environment::Development
        );
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("sandbox".parse::<Environment>().is_err());
    }

    #[test]
    fn test_environment_display_roundtrip() {
        for env in [
            Environment::Development,
            Environment::Staging,
            Environment::Production,
        ] {
            assert_eq!(env.to_string().parse::<Environment>().unwrap(), env);
        }
    }

    #[test]
    fn test_server_addr() {
        assert_eq!(Settings::default().server_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.rate_limit.max_requests = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.database_url = String::new();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.jwt_expires_days = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_secrets_not_serialized() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert!(json.get("database_url").is_none());
        assert!(json.get("jwt_secret").is_none());
    }
}
