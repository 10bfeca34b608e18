use anyhow::{Context, Result, anyhow, bail};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    Mysql,
    Memory,
}

/// Bootstrap admin account, created at startup when absent.
#[derive(Clone)]
pub struct AdminSeed {
    pub id: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_level: tracing::Level,
    pub log_dir: String,
    pub log_stdout: bool,

    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests do not touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage: StorageBackend = parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Mysql)?;

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if storage == StorageBackend::Mysql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORAGE_BACKEND=mysql");
        }

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;

        let admin_seed = match (
            lookup("ADMIN_ID"),
            lookup("ADMIN_EMAIL"),
            lookup("ADMIN_PASSWORD"),
        ) {
            (Some(id), Some(email), Some(password)) => Some(AdminSeed { id, email, password }),
            _ => None,
        };

        let api_prefix = lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string());
        if !api_prefix.starts_with('/') {
            bail!("API_PREFIX must start with '/', got {api_prefix:?}");
        }

        Ok(Self {
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:5000".to_string()),
            storage,
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret,
            token_ttl: parse_or(&lookup, "TOKEN_TTL", 86_400)?, // default 24h

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix,

            log_level: parse_or(&lookup, "LOG_LEVEL", tracing::Level::INFO)?,
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
            log_stdout: parse_or(&lookup, "LOG_STDOUT", false)?,

            admin_seed,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn memory_backend_needs_no_database_url() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.database_url.is_none());
        assert_eq!(config.token_ttl, 86_400);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.log_level, tracing::Level::INFO);
        assert!(config.admin_seed.is_none());
    }

    #[test]
    fn mysql_backend_requires_database_url() {
        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", "secret")]))
            .err()
            .unwrap();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn missing_secret_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[("STORAGE_BACKEND", "memory")]));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_number_is_an_error_not_a_panic() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("JWT_SECRET", "secret"),
            ("TOKEN_TTL", "a day"),
        ]))
        .err()
        .unwrap();
        assert!(format!("{err:#}").contains("TOKEN_TTL"));
    }

    #[test]
    fn admin_seed_needs_all_three_values() {
        let partial = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("JWT_SECRET", "secret"),
            ("ADMIN_EMAIL", "admin@pizzeria.com"),
        ]))
        .unwrap();
        assert!(partial.admin_seed.is_none());

        let full = Config::from_lookup(lookup_from(&[
            ("STORAGE_BACKEND", "MySQL"),
            ("DATABASE_URL", "mysql://root@localhost/attendance"),
            ("JWT_SECRET", "secret"),
            ("ADMIN_ID", "admin1"),
            ("ADMIN_EMAIL", "admin@pizzeria.com"),
            ("ADMIN_PASSWORD", "admin123"),
        ]))
        .unwrap();
        assert_eq!(full.storage, StorageBackend::Mysql);
        assert_eq!(full.admin_seed.unwrap().id, "admin1");
    }
}
