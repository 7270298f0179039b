use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Process-wide settings, read once at start and never mutated.
#[derive(Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub gemini_api_key: String,
    pub openai_base_url: String,
    pub gemini_base_url: String,
    pub request_timeout: Duration,
    pub host: String,
    pub port: u16,
    pub template_dir: String,
    pub static_dir: String,
    pub max_image_bytes: usize,
    pub allow_private_image_hosts: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "REQUEST_TIMEOUT_SECS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw.clone(),
            })?,
            None => 8080,
        };

        let max_image_bytes = match get("MAX_IMAGE_BYTES") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(bytes) if bytes > 0 => bytes,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "MAX_IMAGE_BYTES",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_MAX_IMAGE_BYTES,
        };

        let allow_private_image_hosts = match get("ALLOW_PRIVATE_IMAGE_HOSTS") {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid {
                name: "ALLOW_PRIVATE_IMAGE_HOSTS",
                value: raw,
            })?,
            None => false,
        };

        Ok(Self {
            openai_api_key: required("OPENAI_API_KEY")?,
            gemini_api_key: required("GEMINI_API_KEY")?,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            gemini_base_url: get("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            template_dir: get("TEMPLATE_DIR").unwrap_or_else(|| "templates".to_string()),
            static_dir: get("STATIC_DIR").unwrap_or_else(|| "static".to_string()),
            max_image_bytes,
            allow_private_image_hosts,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

// Keys stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &"<redacted>")
            .field("gemini_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("template_dir", &self.template_dir)
            .field("static_dir", &self.static_dir)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("allow_private_image_hosts", &self.allow_private_image_hosts)
            .finish()
    }
}
