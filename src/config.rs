//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub payments: PaymentsConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_base_url: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

/// Signing keys, checkout location and host platform settings
#[derive(Clone)]
pub struct PaymentsConfig {
    pub secret_key: String,
    pub api_key: String,
    pub platform_secret_key: String,
    pub checkout_path: String,
    pub notify_url: Option<String>,
    pub notify_timeout: Duration,
    pub default_currency: String,
}

// Secrets stay out of debug output.
impl std::fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsConfig")
            .field("secret_key", &"<redacted>")
            .field("api_key", &"<redacted>")
            .field("platform_secret_key", &"<redacted>")
            .field("checkout_path", &self.checkout_path)
            .field("notify_url", &self.notify_url)
            .field("notify_timeout", &self.notify_timeout)
            .field("default_currency", &self.default_currency)
            .finish()
    }
}

const MIN_SECRET_LEN: usize = 16;

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            payments: PaymentsConfig::from_env()?,
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.logging.validate()?;
        self.payments.validate()?;

        Ok(())
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".to_string()))?;
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port))
            .trim_end_matches('/')
            .to_string();

        Ok(ServerConfig {
            host,
            port,
            public_base_url,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue(
                "SERVER_PORT cannot be 0".to_string(),
            ));
        }

        if self.host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVER_HOST cannot be empty".to_string(),
            ));
        }

        if !self.public_base_url.starts_with("http://")
            && !self.public_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue(
                "PUBLIC_BASE_URL must be a valid URL".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            format: LogFormat::Plain,
        }
    }
}

impl PaymentsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret_key = env::var("PAYMENT_SECRET_KEY")
            .map_err(|_| ConfigError::MissingVariable("PAYMENT_SECRET_KEY".to_string()))?;
        let api_key = env::var("PAYMENT_API_KEY")
            .map_err(|_| ConfigError::MissingVariable("PAYMENT_API_KEY".to_string()))?;
        let platform_secret_key =
            env::var("PLATFORM_SECRET_KEY").unwrap_or_else(|_| secret_key.clone());

        Ok(PaymentsConfig {
            secret_key,
            api_key,
            platform_secret_key,
            checkout_path: env::var("CHECKOUT_PATH").unwrap_or_else(|_| "/checkout".to_string()),
            notify_url: env::var("PLATFORM_NOTIFY_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            notify_timeout: Duration::from_secs(
                env::var("NOTIFY_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("NOTIFY_TIMEOUT_SECS".to_string()))?,
            ),
            default_currency: env::var("DEFAULT_CURRENCY")
                .unwrap_or_else(|_| "USD".to_string())
                .to_uppercase(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::ValidationFailed(format!(
                "PAYMENT_SECRET_KEY must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        if self.platform_secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::ValidationFailed(format!(
                "PLATFORM_SECRET_KEY must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        if self.api_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_API_KEY cannot be empty".to_string(),
            ));
        }

        if !self.checkout_path.starts_with('/') {
            return Err(ConfigError::InvalidValue(
                "CHECKOUT_PATH must start with '/'".to_string(),
            ));
        }

        if let Some(url) = &self.notify_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue(
                    "PLATFORM_NOTIFY_URL must be a valid URL".to_string(),
                ));
            }
        }

        if self.notify_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("NOTIFY_TIMEOUT_SECS".to_string()));
        }

        if !crate::payments::types::is_currency_code(&self.default_currency) {
            return Err(ConfigError::InvalidValue("DEFAULT_CURRENCY".to_string()));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
