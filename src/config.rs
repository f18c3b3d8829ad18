//! Runtime settings from environment variables (a `.env` file is loaded first by the binary).

use crate::error::ConfigError;
use std::time::Duration;

const DEV_JWT_SECRET: &str = "insecure-dev-change-me";
const DEFAULT_ADMINS: &str = "taiga@urbdrive.com,alex@example.com,admin@urbdrive.com";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub environment: Environment,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub admin_emails: Vec<String>,
    pub storage: StorageBackend,
    pub max_connections: u32,
    pub request_timeout: Duration,
}

impl Default for Config {
    /// Development settings; what `from_env` yields with an empty environment.
    fn default() -> Self {
        Config {
            database_url: "postgres://localhost/urbandrive".into(),
            host: "0.0.0.0".into(),
            port: 3001,
            base_url: "http://localhost:3001".into(),
            environment: Environment::Development,
            jwt_secret: DEV_JWT_SECRET.into(),
            token_ttl: chrono::Duration::hours(24 * 7),
            admin_emails: parse_emails(DEFAULT_ADMINS),
            storage: StorageBackend::Postgres,
            max_connections: 5,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let environment = match get("APP_ENV").or_else(|| get("NODE_ENV")).as_deref() {
            Some(v) if v.eq_ignore_ascii_case("production") => Environment::Production,
            _ => Environment::Development,
        };
        let jwt_secret = match (get("JWT_SECRET"), environment) {
            (Some(secret), _) => secret,
            (None, Environment::Production) => return Err(ConfigError::Missing("JWT_SECRET")),
            (None, Environment::Development) => defaults.jwt_secret,
        };
        let host = get("HOST").unwrap_or(defaults.host);
        let port = parse_or("PORT", get("PORT"), defaults.port)?;
        let base_url = get("BASE_URL").unwrap_or_else(|| {
            let shown = if host == "0.0.0.0" { "localhost" } else { host.as_str() };
            format!("http://{}:{}", shown, port)
        });
        let storage = match get("STORAGE").as_deref() {
            None => defaults.storage,
            Some(v) if v.eq_ignore_ascii_case("postgres") => StorageBackend::Postgres,
            Some(v) if v.eq_ignore_ascii_case("memory") => StorageBackend::Memory,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE",
                    value: v.to_string(),
                })
            }
        };
        let ttl_hours: i64 = parse_or("TOKEN_TTL_HOURS", get("TOKEN_TTL_HOURS"), 24 * 7)?;
        if ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "TOKEN_TTL_HOURS",
                value: ttl_hours.to_string(),
            });
        }
        let timeout_secs: u64 = parse_or("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"), 30)?;

        Ok(Config {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            host,
            port,
            base_url,
            environment,
            jwt_secret,
            token_ttl: chrono::Duration::hours(ttl_hours),
            admin_emails: get("ADMIN_EMAILS")
                .map(|v| parse_emails(&v))
                .unwrap_or(defaults.admin_emails),
            storage,
            max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), defaults.max_connections)?,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// The plaintext `x-user-email` identity is never honoured in production.
    pub fn dev_identity_enabled(&self) -> bool {
        !self.is_production()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn parse_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn empty_environment_gives_development_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.environment, Environment::Development);
        assert!(cfg.dev_identity_enabled());
        assert_eq!(cfg.port, 3001);
        assert_eq!(cfg.base_url, "http://localhost:3001");
        assert_eq!(cfg.admin_emails.len(), 3);
        assert_eq!(cfg.storage, StorageBackend::Postgres);
    }

    #[test]
    fn production_requires_a_secret() {
        assert!(matches!(
            config(&[("NODE_ENV", "production")]),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));
        let cfg = config(&[("APP_ENV", "Production"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert!(!cfg.dev_identity_enabled());
    }

    #[test]
    fn parses_lists_and_numbers() {
        let cfg = config(&[
            ("ADMIN_EMAILS", " Root@Example.com , ,ops@example.com"),
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("STORAGE", "memory"),
        ])
        .unwrap();
        assert_eq!(cfg.admin_emails, vec!["root@example.com", "ops@example.com"]);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
        assert_eq!(cfg.base_url, "http://127.0.0.1:8080");
        assert_eq!(cfg.storage, StorageBackend::Memory);
    }

    #[test]
    fn rejects_garbage() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("STORAGE", "redis")]).is_err());
        assert!(config(&[("TOKEN_TTL_HOURS", "0")]).is_err());
    }
}
