//! `config.toml` schema and the `MOCKVIEW_*` environment overlay.

use mockview_types::Language;
use mockview_voice::{ElevenLabsConfig, OpenAiConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Everything the binary reads at start-up. Every field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote provider endpoints and models. API keys are not configured
    /// here; they live in the credential store.
    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

/// Listen address.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding sessions, turns and (by default) API keys.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "mockview_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit one JSON object per log line.
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// bcrypt work factor for session secrets.
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

/// Where provider API keys are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// The `settings` table of the application database.
    #[default]
    Database,
    /// The operating system keyring.
    Keyring,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub backend: CredentialBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Spoken language used when a session starts without one.
    #[serde(default = "default_language_code")]
    pub default_language: String,
}

impl ChatConfig {
    /// Resolves the configured default language.
    pub fn default_language(&self) -> Result<Language, ConfigError> {
        Language::from_code(&self.default_language)
            .map_err(|e| ConfigError::Invalid(format!("chat.default_language: {e}")))
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "mockview.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bcrypt_cost() -> u32 {
    mockview_auth::DEFAULT_COST
}

fn default_language_code() -> String {
    Language::default().code().to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_language: default_language_code(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Reads `path` (a missing file counts as empty) and layers the
/// `MOCKVIEW_*` environment on top:
///
/// | Variable | Field |
/// |---|---|
/// | `MOCKVIEW_HOST`, `MOCKVIEW_PORT` | `server.host`, `server.port` |
/// | `MOCKVIEW_DB_PATH` | `database.path` |
/// | `MOCKVIEW_LOG_LEVEL`, `MOCKVIEW_LOG_JSON` | `logging.level`, `logging.json` (`true`/`1`) |
/// | `MOCKVIEW_OPENAI_BASE_URL` | `providers.openai.base_url` |
/// | `MOCKVIEW_ELEVENLABS_BASE_URL` | `providers.elevenlabs.base_url` |
/// | `MOCKVIEW_BCRYPT_COST` | `auth.bcrypt_cost` |
/// | `MOCKVIEW_CREDENTIALS_BACKEND` | `credentials.backend` |
/// | `MOCKVIEW_DEFAULT_LANGUAGE` | `chat.default_language` |
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let contents = match path {
        Some(path) => read_if_present(path)?,
        None => None,
    };
    let config = match contents {
        Some(text) => toml::from_str(&text)?,
        None => Config::default(),
    };
    Ok(apply_env_overrides(config, |key| std::env::var(key).ok()))
}

fn read_if_present(path: &str) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::FileRead(e)),
    }
}

/// Applies `MOCKVIEW_*` overrides read through `lookup`. Values that fail
/// to parse are ignored.
pub fn apply_env_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(host) = lookup("MOCKVIEW_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("MOCKVIEW_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = lookup("MOCKVIEW_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = lookup("MOCKVIEW_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("MOCKVIEW_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(url) = lookup("MOCKVIEW_OPENAI_BASE_URL") {
        config.providers.openai.base_url = url;
    }
    if let Some(url) = lookup("MOCKVIEW_ELEVENLABS_BASE_URL") {
        config.providers.elevenlabs.base_url = url;
    }
    if let Some(cost) = lookup("MOCKVIEW_BCRYPT_COST") {
        if let Ok(parsed) = cost.parse() {
            config.auth.bcrypt_cost = parsed;
        }
    }
    if let Some(backend) = lookup("MOCKVIEW_CREDENTIALS_BACKEND") {
        match backend.as_str() {
            "database" => config.credentials.backend = CredentialBackend::Database,
            "keyring" => config.credentials.backend = CredentialBackend::Keyring,
            other => tracing::warn!(value = other, "ignoring unknown credentials backend"),
        }
    }
    if let Some(language) = lookup("MOCKVIEW_DEFAULT_LANGUAGE") {
        config.chat.default_language = language;
    }

    config
}
