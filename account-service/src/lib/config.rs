use std::env;
use std::time::Duration;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::outbound::email::OutboxCipher;
use crate::outbound::email::RelayConfig;

/// Minimum HS256 key length in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub environment: RunMode,
    pub reset: ResetConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_minutes: i64,
    pub cookie_expires_in_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResetConfig {
    pub token_ttl_minutes: i64,
    /// Base of the link mailed to the account owner; the secret is appended
    /// as `/resetPassword/{secret}`.
    pub url_base: String,
    /// Answer unknown emails with the regular acknowledgment instead of 404.
    #[serde(default)]
    pub conceal_unknown_accounts: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub from: String,
    /// Standard base64 of the 32-byte key sealing queued email bodies.
    pub outbox_key: String,
    #[serde(default = "default_poll_interval_seconds")]
    pub relay_poll_interval_seconds: u64,
    #[serde(default = "default_max_attempts")]
    pub relay_max_attempts: u32,
}

impl EmailConfig {
    pub fn relay(&self) -> RelayConfig {
        RelayConfig {
            poll_interval: Duration::from_secs(self.relay_poll_interval_seconds),
            max_attempts: self.relay_max_attempts,
            ..RelayConfig::default()
        }
    }
}

/// Deployment mode; only `Production` marks the session cookie `Secure`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Development,
    Production,
}

impl RunMode {
    pub fn is_production(&self) -> bool {
        matches!(self, RunMode::Production)
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_poll_interval_seconds() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    5
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .set_default("environment", run_mode.as_str())?
            // Layer on environment variables (with __ as separator)
            // Example: JWT__SECRET=... overrides jwt.secret
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the service cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(ConfigError::Message(format!(
                "jwt.secret must be at least {} bytes",
                MIN_JWT_SECRET_BYTES
            )));
        }
        if self.jwt.expires_in_minutes <= 0 {
            return Err(ConfigError::Message(
                "jwt.expires_in_minutes must be positive".to_string(),
            ));
        }
        if self.jwt.cookie_expires_in_days <= 0 {
            return Err(ConfigError::Message(
                "jwt.cookie_expires_in_days must be positive".to_string(),
            ));
        }
        if self.reset.token_ttl_minutes <= 0 {
            return Err(ConfigError::Message(
                "reset.token_ttl_minutes must be positive".to_string(),
            ));
        }
        if let Err(e) = OutboxCipher::from_base64(&self.email.outbox_key) {
            return Err(ConfigError::Message(format!("email.outbox_key: {}", e)));
        }
        Ok(())
    }
}
