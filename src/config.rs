use std::{env, fmt, net::SocketAddr, time::Duration};

use thiserror::Error;
use url::Url;

use crate::domain::reference::is_builtin_language;

pub const DEFAULT_BASE_URL: &str = "https://api.currentsapi.services/v1/";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const MIN_TIMEOUT_SECS: u64 = 10;
pub const MAX_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const MAX_RESULTS_CEILING: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_token: String,
    pub bind_addr: String,
    pub bind_port: u16,
    pub currents: CurrentsSettings,
}

/// Settings for talking to the Currents API and shaping its results.
#[derive(Clone)]
pub struct CurrentsSettings {
    pub api_key: Option<String>,
    pub base_url: Url,
    pub default_language: String,
    pub timeout_secs: u64,
    pub max_results: usize,
    pub enable_caching: bool,
}

impl CurrentsSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// First characters of the key followed by an ellipsis, for status output.
    pub fn masked_api_key(&self) -> Option<String> {
        let key = self.api_key.as_deref()?;
        if key.chars().count() > 8 {
            Some(format!("{}...", key.chars().take(8).collect::<String>()))
        } else {
            Some("***".to_string())
        }
    }
}

impl Default for CurrentsSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            default_language: DEFAULT_LANGUAGE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_results: DEFAULT_MAX_RESULTS,
            enable_caching: true,
        }
    }
}

impl fmt::Debug for CurrentsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurrentsSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url.as_str())
            .field("default_language", &self.default_language)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_results", &self.max_results)
            .field("enable_caching", &self.enable_caching)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MCP_API_TOKEN is required and must not be empty")]
    MissingApiToken,
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("CURRENTS_BASE_URL must be an absolute http(s) URL")]
    InvalidBaseUrl,
    #[error("DEFAULT_LANGUAGE must be a supported language code")]
    InvalidDefaultLanguage,
    #[error("API_TIMEOUT must be an integer between 10 and 30")]
    InvalidTimeout,
    #[error("MAX_RESULTS must be an integer between 1 and 100")]
    InvalidMaxResults,
    #[error("ENABLE_CACHING must be a boolean")]
    InvalidCachingFlag,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_token = non_empty("MCP_API_TOKEN").ok_or(ConfigError::MissingApiToken)?;

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = non_empty("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let base_url = non_empty("CURRENTS_BASE_URL")
            .map(|value| parse_base_url(&value))
            .transpose()?
            .unwrap_or_else(|| CurrentsSettings::default().base_url);

        let default_language = non_empty("DEFAULT_LANGUAGE")
            .map(|value| value.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        if !is_builtin_language(&default_language) {
            return Err(ConfigError::InvalidDefaultLanguage);
        }

        let timeout_secs = non_empty("API_TIMEOUT")
            .map(|value| {
                value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| (MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(secs))
                    .ok_or(ConfigError::InvalidTimeout)
            })
            .transpose()?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let max_results = non_empty("MAX_RESULTS")
            .map(|value| {
                value
                    .parse::<usize>()
                    .ok()
                    .filter(|max| (1..=MAX_RESULTS_CEILING).contains(max))
                    .ok_or(ConfigError::InvalidMaxResults)
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let enable_caching = non_empty("ENABLE_CACHING")
            .map(|value| parse_bool(&value).ok_or(ConfigError::InvalidCachingFlag))
            .transpose()?
            .unwrap_or(true);

        let config = Self {
            api_token,
            bind_addr,
            bind_port,
            currents: CurrentsSettings {
                api_key: non_empty("CURRENTS_API_KEY"),
                base_url,
                default_language,
                timeout_secs,
                max_results,
                enable_caching,
            },
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    // A trailing slash keeps `Url::join` from dropping the last path segment.
    let with_slash = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };

    let url = Url::parse(&with_slash).map_err(|_| ConfigError::InvalidBaseUrl)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(url)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
