use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Database URL. Absent means demo mode: rooms live purely in memory,
    /// hydration and persistence are no-ops.
    pub db_url: Option<String>,

    /// Quiet period of the persistence debouncer, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            db_url: None,
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_debounce_ms() -> u64 {
    2000
}
