//! Configuration loading and validation for the fortune API.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any variable is present but invalid.
//! AWS credentials and region are not part of this struct; the SDK resolves
//! them from its standard provider chain.

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use serde::Deserialize;

/// Longest accepted wait for a new table to become active.
pub const MAX_TABLE_READY_TIMEOUT_SECS: u64 = 3600;

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// DynamoDB table holding the fortunes.
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// The single browser origin allowed by the CORS policy.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Upper bound (seconds) on waiting for a newly created table to turn active.
    #[serde(default = "default_table_ready_timeout")]
    pub table_ready_timeout_secs: u64,

    /// Endpoint override for DynamoDB, e.g. `http://localhost:8000` for
    /// DynamoDB Local. Unset in production.
    #[serde(default)]
    pub dynamodb_endpoint_url: Option<String>,

    /// OTLP/gRPC collector endpoint. Span export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    5000
}
fn default_table_name() -> String {
    "fortune-of-the-day".into()
}
fn default_allowed_origin() -> String {
    "https://fortune.lnkphm.online".into()
}
fn default_table_ready_timeout() -> u64 {
    300
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("PORT must be > 0");
        }
        ensure_non_empty(&self.table_name, "TABLE_NAME")?;
        ensure_non_empty(&self.allowed_origin, "ALLOWED_ORIGIN")?;
        let Some(authority) = self
            .allowed_origin
            .strip_prefix("https://")
            .or_else(|| self.allowed_origin.strip_prefix("http://"))
        else {
            anyhow::bail!("ALLOWED_ORIGIN must start with http:// or https://");
        };
        // Browsers send `scheme://host[:port]` with nothing after it.
        if authority.is_empty() || authority.contains(['/', '?', '#']) {
            anyhow::bail!("ALLOWED_ORIGIN must be scheme://host[:port] with no path");
        }
        HeaderValue::from_str(&self.allowed_origin)
            .context("ALLOWED_ORIGIN is not a valid header value")?;
        if self.table_ready_timeout_secs == 0
            || self.table_ready_timeout_secs > MAX_TABLE_READY_TIMEOUT_SECS
        {
            anyhow::bail!(
                "TABLE_READY_TIMEOUT_SECS must be between 1 and {MAX_TABLE_READY_TIMEOUT_SECS}"
            );
        }
        if let Some(url) = &self.dynamodb_endpoint_url {
            ensure_non_empty(url, "DYNAMODB_ENDPOINT_URL")?;
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
