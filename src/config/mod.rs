use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Rest,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "rest" => Ok(Self::Rest),
            "redis" => Ok(Self::Redis),
            _ => Err(()),
        }
    }
}

/// 三个数据集在层级数据库中的路径
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub locations: String,
    pub pets: String,
    pub profiles: String,
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            locations: "locations".into(),
            pets: "pets".into(),
            profiles: "users".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub store_backend: StoreBackend,
    pub store_url: Option<String>,
    pub store_auth: Option<String>,
    pub store_seed_file: Option<String>,
    pub store_key_prefix: String,
    pub store_paths: StorePaths,
    pub nearby_cache_ttl_secs: u64,
    /// 半径上限（米），超过时拒绝请求；未设置则不限制
    pub max_search_radius: Option<f64>,
    pub max_result_limit: Option<usize>,
    pub redis_url: Option<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
            store_backend: StoreBackend::Memory,
            store_url: None,
            store_auth: None,
            store_seed_file: None,
            store_key_prefix: "petmatch:".into(),
            store_paths: StorePaths::default(),
            nearby_cache_ttl_secs: 5,
            max_search_radius: None,
            max_result_limit: None,
            redis_url: None,
            rate_limit_window_secs: 60,
            rate_limit_requests: 0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let store_backend = match optional("STORE_BACKEND") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "STORE_BACKEND",
                value,
            })?,
            None => defaults.store_backend,
        };

        let config = Config {
            server_host: optional("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parsed("SERVER_PORT", defaults.server_port)?,
            api_base_uri: optional("API_BASE_URI").unwrap_or(defaults.api_base_uri),
            store_backend,
            store_url: optional("STORE_URL"),
            store_auth: optional("STORE_AUTH"),
            store_seed_file: optional("STORE_SEED_FILE"),
            store_key_prefix: optional("STORE_KEY_PREFIX").unwrap_or(defaults.store_key_prefix),
            store_paths: StorePaths {
                locations: optional("LOCATIONS_PATH").unwrap_or(defaults.store_paths.locations),
                pets: optional("PETS_PATH").unwrap_or(defaults.store_paths.pets),
                profiles: optional("PROFILES_PATH").unwrap_or(defaults.store_paths.profiles),
            },
            nearby_cache_ttl_secs: parsed_secs("NEARBY_CACHE_TTL", defaults.nearby_cache_ttl_secs)?,
            max_search_radius: optional_parsed("MAX_SEARCH_RADIUS")?,
            max_result_limit: optional_parsed("MAX_RESULT_LIMIT")?,
            redis_url: optional("REDIS_URL"),
            rate_limit_window_secs: parsed_secs(
                "RATE_LIMIT_WINDOW",
                defaults.rate_limit_window_secs,
            )?,
            rate_limit_requests: parsed("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests)?,
        };

        // rest 和 redis 后端必须提供地址
        match config.store_backend {
            StoreBackend::Rest if config.store_url.is_none() => {
                Err(ConfigError::Missing("STORE_URL"))
            }
            StoreBackend::Redis if config.store_url.is_none() && config.redis_url.is_none() => {
                Err(ConfigError::Missing("STORE_URL"))
            }
            _ => Ok(config),
        }
    }

    pub fn nearby_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.nearby_cache_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn rate_limit_enabled(&self) -> bool {
        self.redis_url.is_some() && self.rate_limit_requests > 0
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_value<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    optional(key).map_or(Ok(default), |value| parse_value(key, value))
}

fn optional_parsed<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    optional(key).map(|value| parse_value(key, value)).transpose()
}

// 秒数允许带 s 后缀，如 "5s"
fn parse_secs(key: &'static str, value: String) -> Result<u64, ConfigError> {
    match value.trim().strip_suffix('s') {
        Some(digits) => digits.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => parse_value(key, value),
    }
}

fn parsed_secs(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    optional(key).map_or(Ok(default), |value| parse_secs(key, value))
}
