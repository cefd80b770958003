// src/config.rs

use std::{env, fmt, net::SocketAddr};

use dotenvy::dotenv;
use url::Url;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the exam service REST API.
    pub exam_service_url: Url,
    pub exam_service_timeout_secs: u64,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    /// See `GradingPolicy::legacy_substring_match`.
    pub legacy_substring_match: bool,
    /// Sessions untouched for this long are dropped.
    pub session_ttl_secs: u64,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_url =
            env::var("EXAM_SERVICE_URL").map_err(|_| ConfigError::Missing("EXAM_SERVICE_URL"))?;
        let exam_service_url = Url::parse(&raw_url).map_err(|_| ConfigError::Invalid {
            key: "EXAM_SERVICE_URL",
            value: raw_url.clone(),
        })?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr: SocketAddr = parse_var("BIND_ADDR", "0.0.0.0:3000".parse().ok())?;
        let exam_service_timeout_secs: u64 = parse_var("EXAM_SERVICE_TIMEOUT_SECS", Some(10))?;
        let legacy_substring_match: bool = parse_var("LEGACY_SUBSTRING_MATCH", Some(true))?;
        let session_ttl_secs: u64 = parse_var("SESSION_TTL_SECS", Some(4 * 60 * 60))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            exam_service_url,
            exam_service_timeout_secs,
            jwt_secret,
            rust_log,
            bind_addr,
            cors_origins,
            legacy_substring_match,
            session_ttl_secs,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    key: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => default.ok_or(ConfigError::Missing(key)),
    }
}
