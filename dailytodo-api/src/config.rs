//! Configuration management for the API server
//!
//! Loads configuration from environment variables (and `.env` when present)
//! into a type-safe struct.
//!
//! # Environment Variables
//!
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `API_PORT`: Port to bind to (default: 8080)
//! - `CORS_ORIGINS`: Comma separated allowed origins (default: *)
//! - `DATABASE_URL`: PostgreSQL connection string; in-memory storage when unset
//! - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
//! - `QUOTA_UTC_OFFSET`: Offset defining calendar days for quotas (default: UTC)
//! - `LOG_FORMAT`: `text` or `json` (default: text)
//! - `RUST_LOG`: Log filter
//!
//! # Example
//!
//! ```no_run
//! use dailytodo_api::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use dailytodo_shared::clock::Calendar;
use dailytodo_shared::db::pool::DatabaseConfig;
use dailytodo_shared::store::StorageConfig;
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Storage backend
    pub storage: StorageConfig,

    /// Calendar used for daily quotas
    pub calendar: Calendar,

    /// Log output format
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,

    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = lookup("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is invalid: {}", e))?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let storage = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => {
                let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse::<u32>()
                    .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;

                StorageConfig::Postgres(DatabaseConfig {
                    url,
                    max_connections,
                    ..Default::default()
                })
            }
            None => StorageConfig::Memory,
        };

        let calendar = match lookup("QUOTA_UTC_OFFSET") {
            Some(offset) => Calendar::new(Calendar::parse_offset(&offset)?),
            None => Calendar::utc(),
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(format) => format.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
            },
            storage,
            calendar,
            log_format,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*"]);
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.calendar, Calendar::utc());
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_database_url_selects_postgres() {
        let config = load(&[
            ("DATABASE_URL", "postgresql://localhost/dailytodo"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
        ])
        .unwrap();

        match config.storage {
            StorageConfig::Postgres(db) => {
                assert_eq!(db.url, "postgresql://localhost/dailytodo");
                assert_eq!(db.max_connections, 4);
            }
            other => panic!("expected postgres, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_database_url_means_memory() {
        let config = load(&[("DATABASE_URL", "  ")]).unwrap();
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("QUOTA_UTC_OFFSET", "-05:00"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.calendar.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(load(&[("API_PORT", "eighty")]).is_err());
        assert!(load(&[("QUOTA_UTC_OFFSET", "Mars/Olympus")]).is_err());
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
        assert!(load(&[
            ("DATABASE_URL", "postgresql://localhost/x"),
            ("DATABASE_MAX_CONNECTIONS", "-1"),
        ])
        .is_err());
    }
}
