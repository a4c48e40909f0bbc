//! Configuration management for the server.

use std::env;

use docbridge_engine::pool::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};

/// URL scheme selecting the in-process backends.
pub const MEMORY_URL: &str = "memory://";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// MongoDB connection URI, or `memory://`
    pub database_url: String,
    /// Name of the database holding the collections
    pub database_name: String,
    /// Redis URL, or `memory://`; no cache when absent
    pub redis_url: Option<String>,
    /// Shared secret expected in the `auth-token` header
    pub auth_token: String,
    /// Threads serving fire-and-forget writes
    pub write_workers: usize,
    /// Pending fire-and-forget writes before new ones are dropped
    pub write_queue_capacity: usize,
    /// Record every dispatched request in `request_logs`
    pub request_logging: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = var("PORT")
            .unwrap_or_else(|| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_name = var("DATABASE_NAME").unwrap_or_else(|| "docbridge".to_string());

        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None => mongo_url_from_parts(&var, &database_name)?,
        };

        let redis_url = var("REDIS_URL");

        let auth_token = var("AUTH_TOKEN").ok_or(ConfigError::MissingAuthToken)?;

        let write_workers = parse_number(&var, "WRITE_WORKERS", DEFAULT_WORKERS)?;
        let write_queue_capacity =
            parse_number(&var, "WRITE_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?;

        let request_logging = match var("REQUEST_LOGGING") {
            None => true,
            Some(value) => parse_bool(&value).ok_or(ConfigError::Invalid {
                name: "REQUEST_LOGGING",
                value,
            })?,
        };

        Ok(Self {
            host,
            port,
            database_url,
            database_name,
            redis_url,
            auth_token,
            write_workers,
            write_queue_capacity,
            request_logging,
        })
    }
}

/// `mongodb://[user:pass@]host:port/database[?options]`
fn mongo_url_from_parts<F>(var: &F, database_name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let host = var("MONGO_HOST").ok_or(ConfigError::MissingDatabaseUrl)?;
    let port = var("MONGO_PORT").unwrap_or_else(|| "27017".to_string());

    let credentials = match (var("MONGO_USER"), var("MONGO_PASS")) {
        (Some(user), Some(pass)) => format!("{user}:{pass}@"),
        (Some(user), None) => format!("{user}@"),
        _ => String::new(),
    };

    let mut url = format!("mongodb://{credentials}{host}:{port}/{database_name}");
    if let Some(options) = var("MONGO_OPTIONS") {
        url.push('?');
        url.push_str(options.trim_start_matches('?'));
    }
    Ok(url)
}

fn parse_number<F>(var: &F, name: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL or MONGO_HOST environment variable is required")]
    MissingDatabaseUrl,

    #[error("AUTH_TOKEN environment variable is required")]
    MissingAuthToken,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid {name} value: {value}")]
    Invalid { name: &'static str, value: String },
}
