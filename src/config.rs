use crate::error::ConfigError;
use chrono::TimeDelta;
use secrecy::SecretString;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub prompts: PromptConfig,
    pub session: SessionConfig,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

/// Settings for the chat-completion endpoint. Built once at startup.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub default_model: String,
    pub max_tokens: u32,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Total attempts per logical request, the first one included.
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub min_request_interval: Duration,
}

#[derive(Clone)]
pub struct PromptConfig {
    pub language: String,
    pub default_count: u32,
}

#[derive(Clone)]
pub struct SessionConfig {
    /// Idle time after which a session is swept.
    pub ttl: TimeDelta,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.into())),
        Err(_) => Ok(default),
    }
}

fn upload_limit(megabytes: usize) -> Result<usize, ConfigError> {
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| ConfigError::InvalidValue("MAX_UPLOAD_MB".into()))
}

fn session_ttl(secs: u64) -> Result<TimeDelta, ConfigError> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| ConfigError::InvalidValue("SESSION_TTL_SECS".into()))
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("OPENAI_API_KEY".into()))?;

        let retry_count: u32 = parse_env("LLM_RETRY_COUNT", 3)?;
        if retry_count == 0 {
            return Err(ConfigError::InvalidValue("LLM_RETRY_COUNT".into()));
        }

        Ok(Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: parse_env("PORT", 8080)?,
                max_upload_bytes: upload_limit(parse_env("MAX_UPLOAD_MB", 20)?)?,
            },
            provider: ProviderConfig {
                api_key: SecretString::from(api_key),
                base_url: env_or("BASE_URL", DEFAULT_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
                default_model: env_or("DEFAULT_MODEL", DEFAULT_MODEL),
                max_tokens: parse_env("LLM_MAX_TOKENS", 1000)?,
                connect_timeout: Duration::from_secs(parse_env("LLM_CONNECT_TIMEOUT_SECS", 30)?),
                request_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 60)?),
                retry_count,
                retry_delay: Duration::from_millis(parse_env("LLM_RETRY_DELAY_MS", 2000)?),
                min_request_interval: Duration::from_millis(parse_env(
                    "LLM_MIN_REQUEST_INTERVAL_MS",
                    1000,
                )?),
            },
            prompts: PromptConfig {
                language: env_or("PROMPT_LANGUAGE", "Chinese"),
                default_count: std::env::var("QUESTION_COUNT")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            session: SessionConfig {
                ttl: session_ttl(parse_env("SESSION_TTL_SECS", 3600)?)?,
            },
        })
    }
}

impl ProviderConfig {
    /// Provider settings with every default applied and the given key.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            retry_count: 3,
            retry_delay: Duration::from_secs(2),
            min_request_interval: Duration::from_secs(1),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            language: "Chinese".to_string(),
            default_count: 5,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: TimeDelta::seconds(3600),
        }
    }
}
