//! # Configuration
//!
//! Loaded once at startup from the process environment (via `.env` through
//! `dotenvy`, the same convention the engine's sibling tooling uses), into a
//! plain dependency struct passed explicitly to everything that needs it —
//! never read back out of a global. The shape is split by concern
//! (host/database/jwt/recovery/…) rather than one flat bag of fields, and a
//! connection string is treated as something `DatabaseConfig` derives on
//! demand rather than something callers assemble themselves.
//!
//! Parsing a configuration *file* format is outside what this crate does;
//! only environment-variable loading is implemented here.

use std::env;
use std::time::Duration;

use cellar_engine::Error;

#[derive(Clone, Debug)]
pub struct HostConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_seconds: i64,
}

#[derive(Clone, Debug)]
pub struct ApiKeyConfig {
    pub header_name: String,
    pub enabled: bool,
}

#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct RecoveryConfig {
    pub auto_repair: bool,
    pub drop_orphans: bool,
    pub check_timeout: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: HostConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub jwt: JwtConfig,
    pub api_key: ApiKeyConfig,
    pub bootstrap: Option<BootstrapConfig>,
    pub recovery: RecoveryConfig,
    pub cors: CorsConfig,
    /// The path segment every collection/system-resource URL is nested
    /// under, e.g. `/api/orders:list`. Defaults to `api`.
    pub api_prefix: String,
}

impl Config {
    /// Loads configuration from the environment, applying `.env` first if
    /// present. Fails fast with [`Error::Configuration`] on anything
    /// required-but-missing or out of its documented range.
    pub fn from_env() -> Result<Self, Error> {
        dotenvy::dotenv().ok();

        let port = env_or("CELLAR_PORT", "8080").parse::<u16>().map_err(|_| {
            Error::Configuration("CELLAR_PORT must be a valid port number".into())
        })?;
        if port == 0 {
            return Err(Error::Configuration("CELLAR_PORT must be in range 1-65535".into()));
        }

        let connection_string = env::var("DATABASE_URL")
            .map_err(|_| Error::Configuration("DATABASE_URL is not set".into()))?;

        let bootstrap = match (
            env::var("CELLAR_BOOTSTRAP_USERNAME").ok(),
            env::var("CELLAR_BOOTSTRAP_EMAIL").ok(),
            env::var("CELLAR_BOOTSTRAP_PASSWORD").ok(),
        ) {
            (Some(username), Some(email), Some(password)) => Some(BootstrapConfig { username, email, password }),
            (None, None, None) => None,
            _ => {
                return Err(Error::Configuration(
                    "bootstrap requires CELLAR_BOOTSTRAP_USERNAME, _EMAIL, and _PASSWORD together".into(),
                ))
            }
        };

        let check_timeout_secs = env_or("CELLAR_CHECK_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|_| Error::Configuration("CELLAR_CHECK_TIMEOUT_SECS must be an integer".into()))?;

        Ok(Config {
            host: HostConfig { host: env_or("CELLAR_HOST", "0.0.0.0"), port },
            database: DatabaseConfig {
                connection_string,
                max_connections: env_or("CELLAR_DB_MAX_CONNECTIONS", "10")
                    .parse()
                    .map_err(|_| Error::Configuration("CELLAR_DB_MAX_CONNECTIONS must be an integer".into()))?,
            },
            logging: LoggingConfig { path: env::var("CELLAR_LOG_PATH").ok() },
            jwt: JwtConfig {
                secret: env::var("CELLAR_JWT_SECRET")
                    .map_err(|_| Error::Configuration("CELLAR_JWT_SECRET is not set".into()))?,
                expiry_seconds: env_or("CELLAR_JWT_EXPIRY_SECONDS", "3600")
                    .parse()
                    .map_err(|_| Error::Configuration("CELLAR_JWT_EXPIRY_SECONDS must be an integer".into()))?,
            },
            api_key: ApiKeyConfig {
                header_name: env_or("CELLAR_API_KEY_HEADER", "X-API-Key"),
                enabled: env_or("CELLAR_API_KEY_ENABLED", "true") == "true",
            },
            bootstrap,
            recovery: RecoveryConfig {
                auto_repair: env_or("CELLAR_AUTO_REPAIR", "true") == "true",
                drop_orphans: env_or("CELLAR_DROP_ORPHANS", "false") == "true",
                check_timeout: Duration::from_secs(check_timeout_secs),
            },
            cors: CorsConfig {
                allowed_origins: env::var("CELLAR_CORS_ORIGINS")
                    .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                    .unwrap_or_default(),
            },
            api_prefix: env_or("CELLAR_API_PREFIX", "api").trim_matches('/').to_string(),
        })
    }
}

impl DatabaseConfig {
    /// The connection string is the one field this struct actually needs to
    /// hand the Dialect Driver; everything else here is pool tuning.
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
