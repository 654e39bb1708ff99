//! Configuration management for the rules engine

use crate::error::{AppError, Result};
use std::env;

/// Methods offered to a user who has no registered authentication methods.
pub const DEFAULT_AUTH_METHODS: [&str; 4] = ["passkey", "digitalid", "email_otp", "sms_otp"];

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
    /// Rules engine configuration
    pub engine: RulesEngineConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "pretty" or "json"
    pub log_format: String,
    /// Install a Prometheus recorder
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesEngineConfig {
    /// Fallback method set used when the context carries no registered methods
    pub default_auth_methods: Vec<String>,
}

impl Default for RulesEngineConfig {
    fn default() -> Self {
        Self {
            default_auth_methods: DEFAULT_AUTH_METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl RulesEngineConfig {
    /// Parse a comma-separated method list. Blank entries are dropped and an
    /// empty list keeps the built-in defaults.
    pub fn from_method_list(raw: &str) -> Self {
        let methods: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();

        if methods.is_empty() {
            Self::default()
        } else {
            Self {
                default_auth_methods: methods,
            }
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL is required".to_string()))?;

        Ok(Self {
            database: DatabaseConfig {
                url,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .unwrap_or(1),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(false),
            },
            engine: env::var("DEFAULT_AUTH_METHODS")
                .map(|raw| RulesEngineConfig::from_method_list(&raw))
                .unwrap_or_default(),
        })
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
