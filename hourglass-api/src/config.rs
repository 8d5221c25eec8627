/// Configuration management for the API server
///
/// Values come from the process environment (after loading `.env` in
/// development) through the `config` crate, with defaults for everything
/// except the database URL and the JWT secret.
///
/// # Environment Variables
///
/// | Variable                   | Default    |                                         |
/// |----------------------------|------------|-----------------------------------------|
/// | `DATABASE_URL`             | required   | PostgreSQL connection string            |
/// | `DATABASE_MAX_CONNECTIONS` | 10         |                                         |
/// | `API_HOST`                 | 0.0.0.0    |                                         |
/// | `API_PORT`                 | 8080       |                                         |
/// | `CORS_ORIGINS`             | `*`        | comma separated; `*` allows any origin  |
/// | `PRODUCTION`               | false      | enables HSTS                            |
/// | `JWT_SECRET`               | required   | at least 32 characters                  |
/// | `JWT_ACCESS_TTL_HOURS`     | 24         |                                         |
/// | `JWT_REFRESH_TTL_DAYS`     | 30         |                                         |
/// | `STATIC_DIR`               | unset      | SPA bundle served as fallback           |
/// | `BOOTSTRAP_ADMIN_EMAIL`    | unset      | with `BOOTSTRAP_ADMIN_PASSWORD`, creates the first admin |
///
/// # Example
///
/// ```no_run
/// use hourglass_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Listening on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::path::PathBuf;

use anyhow::Context;
use chrono::Duration;
use config::Environment;
use hourglass_shared::auth::jwt::{TokenSigner, MIN_SECRET_LEN};
use hourglass_shared::db::pool::DatabaseConfig;
use serde::Deserialize;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseSettings,
    pub jwt: JwtConfig,

    /// First admin account, created at startup when no admin exists
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any origin
    pub cors_origins: Vec<String>,

    /// Enables HSTS
    pub production: bool,

    /// Built SPA bundle served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct JwtConfig {
    /// Signing secret; keep out of logs
    pub secret: String,
    pub access_ttl_hours: i64,
    pub refresh_ttl_days: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[redacted]")
            .field("access_ttl_hours", &self.access_ttl_hours)
            .field("refresh_ttl_days", &self.refresh_ttl_days)
            .finish()
    }
}

#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Flat view of the environment as the `config` crate sees it
#[derive(Debug, Deserialize)]
struct RawConfig {
    database_url: String,
    database_max_connections: u32,
    api_host: String,
    api_port: u16,
    cors_origins: String,
    production: bool,
    jwt_secret: String,
    jwt_access_ttl_hours: i64,
    jwt_refresh_ttl_days: i64,
    static_dir: Option<String>,
    bootstrap_admin_email: Option<String>,
    bootstrap_admin_password: Option<String>,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_environment(Environment::default().try_parsing(true))
    }

    /// Reads configuration from an explicit environment source
    pub fn from_environment(environment: Environment) -> anyhow::Result<Self> {
        let raw: RawConfig = config::Config::builder()
            .set_default("database_max_connections", 10_i64)?
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 8080_i64)?
            .set_default("cors_origins", "*")?
            .set_default("production", false)?
            .set_default("jwt_access_ttl_hours", 24_i64)?
            .set_default("jwt_refresh_ttl_days", 30_i64)?
            .add_source(environment)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration (DATABASE_URL and JWT_SECRET are required)")?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> anyhow::Result<Self> {
        if raw.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL must not be empty");
        }
        if raw.jwt_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {MIN_SECRET_LEN} characters long");
        }
        if raw.jwt_access_ttl_hours <= 0 || raw.jwt_refresh_ttl_days <= 0 {
            anyhow::bail!("JWT token lifetimes must be positive");
        }

        let cors_origins = raw
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        let bootstrap_admin = match (raw.bootstrap_admin_email, raw.bootstrap_admin_password) {
            (Some(email), Some(password)) if !email.trim().is_empty() => {
                Some(BootstrapAdmin { email, password })
            }
            (Some(_), None) => {
                anyhow::bail!("BOOTSTRAP_ADMIN_PASSWORD is required with BOOTSTRAP_ADMIN_EMAIL")
            }
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host: raw.api_host,
                port: raw.api_port,
                cors_origins,
                production: raw.production,
                static_dir: raw
                    .static_dir
                    .filter(|d| !d.trim().is_empty())
                    .map(PathBuf::from),
            },
            database: DatabaseSettings {
                url: raw.database_url,
                max_connections: raw.database_max_connections,
            },
            jwt: JwtConfig {
                secret: raw.jwt_secret,
                access_ttl_hours: raw.jwt_access_ttl_hours,
                refresh_ttl_days: raw.jwt_refresh_ttl_days,
            },
            bootstrap_admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }

    pub fn token_signer(&self) -> TokenSigner {
        TokenSigner::new(
            self.jwt.secret.clone(),
            Duration::hours(self.jwt.access_ttl_hours),
            Duration::days(self.jwt.refresh_ttl_days),
        )
    }

    pub fn pool_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn env(pairs: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().try_parsing(true).source(Some(map))
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_environment(env(&[
            ("DATABASE_URL", "postgresql://localhost/hourglass"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.jwt.access_ttl_hours, 24);
        assert_eq!(config.jwt.refresh_ttl_days, 30);
        assert!(config.allows_any_origin());
        assert!(!config.api.production);
        assert!(config.api.static_dir.is_none());
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_environment(env(&[
            ("DATABASE_URL", "postgresql://localhost/hourglass"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "9000"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("PRODUCTION", "true"),
            ("STATIC_DIR", "/srv/hourglass"),
            ("BOOTSTRAP_ADMIN_EMAIL", "admin@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "Password1"),
        ]))
        .unwrap();

        assert_eq!(config.api.port, 9000);
        assert_eq!(
            config.api.cors_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(!config.allows_any_origin());
        assert!(config.api.production);
        assert_eq!(config.api.static_dir, Some(PathBuf::from("/srv/hourglass")));
        assert_eq!(
            config.bootstrap_admin.map(|b| b.email),
            Some("admin@example.com".to_string())
        );
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = Config::from_environment(env(&[
            ("DATABASE_URL", "postgresql://localhost/hourglass"),
            ("JWT_SECRET", "short"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_database_url_rejected() {
        assert!(Config::from_environment(env(&[("JWT_SECRET", SECRET)])).is_err());
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let config = Config::from_environment(env(&[
            ("DATABASE_URL", "postgresql://localhost/hourglass"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();
        assert!(!format!("{config:?}").contains(SECRET));
    }
}
