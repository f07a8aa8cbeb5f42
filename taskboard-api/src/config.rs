/// Configuration management for the API server
///
/// Configuration is read from environment variables into a typed struct.
/// A `.env` file in the working directory is loaded first when present.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins, `*` for any (default: `*`)
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
/// - `REORDER_LOCK_TIMEOUT_MS`: row lock wait before a reorder is retryable, at least 1 (default: 2000)
/// - `REORDER_MAX_ATTEMPTS`: attempts per reorder or delete on conflict, at least 1 (default: 3)
/// - `RUST_LOG`: Log filter (default: `taskboard_api=debug,tower_http=debug`)
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use taskboard_shared::reorder::coordinator::DEFAULT_MAX_ATTEMPTS;

/// Default wait for row locks inside a reorder transaction
pub const DEFAULT_REORDER_LOCK_TIMEOUT_MS: u64 = 2000;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Reorder coordinator configuration
    pub reorder: ReorderConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any origin
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 characters. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderConfig {
    /// How long a reorder waits on a row lock, in milliseconds
    pub lock_timeout_ms: u64,

    /// Attempts per operation before a conflict is reported to the client
    pub max_attempts: u32,
}

impl ReorderConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: DEFAULT_REORDER_LOCK_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A numeric variable does not parse
    /// - `REORDER_LOCK_TIMEOUT_MS` or `REORDER_MAX_ATTEMPTS` is 0
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is not a valid port: {}", e))?;

        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is not a number: {}", e))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        validate_jwt_secret(&jwt_secret)?;

        let lock_timeout_ms = match env::var("REORDER_LOCK_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("REORDER_LOCK_TIMEOUT_MS is not a number: {}", e))?,
            Err(_) => DEFAULT_REORDER_LOCK_TIMEOUT_MS,
        };
        // Postgres reads lock_timeout = 0 as "wait forever"
        validate_lock_timeout(lock_timeout_ms)?;

        let max_attempts = match env::var("REORDER_MAX_ATTEMPTS") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|e| anyhow::anyhow!("REORDER_MAX_ATTEMPTS is not a number: {}", e))?,
            Err(_) => DEFAULT_MAX_ATTEMPTS,
        };
        if max_attempts == 0 {
            anyhow::bail!("REORDER_MAX_ATTEMPTS must be at least 1");
        }

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            reorder: ReorderConfig {
                lock_timeout_ms,
                max_attempts,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|origin| origin == "*")
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_lock_timeout(lock_timeout_ms: u64) -> anyhow::Result<()> {
    if lock_timeout_ms == 0 {
        anyhow::bail!("REORDER_LOCK_TIMEOUT_MS must be at least 1");
    }
    Ok(())
}

fn validate_jwt_secret(secret: &str) -> anyhow::Result<()> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        anyhow::bail!(
            "JWT_SECRET must be at least {} characters long",
            MIN_JWT_SECRET_LENGTH
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            reorder: ReorderConfig::default(),
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reorder_lock_timeout_default() {
        let reorder = ReorderConfig::default();
        assert_eq!(reorder.lock_timeout(), Duration::from_millis(2000));
        assert_eq!(reorder.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_zero_lock_timeout_rejected() {
        let err = validate_lock_timeout(0).unwrap_err();
        assert!(err.to_string().contains("REORDER_LOCK_TIMEOUT_MS"));
        assert!(validate_lock_timeout(1).is_ok());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://a.example, https://b.example ,"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_allows_any_origin() {
        let mut config = config();
        assert!(config.allows_any_origin());

        config.api.cors_origins = vec!["https://app.example".to_string()];
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        assert!(validate_jwt_secret("too-short").is_err());
        assert!(validate_jwt_secret(&"x".repeat(32)).is_ok());
    }
}
