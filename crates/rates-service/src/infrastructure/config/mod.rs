//! Configuration loading for the rates service
//!
//! Layers, later ones winning:
//! - Built-in defaults
//! - JSON file given with `--config`
//! - Environment variables (`APP_PORT`, `POSTGRES_HOST`, ...)
//! - Command line database overrides (`--host`, `--port`, ...)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Root configuration for the rates service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// RPC listener
    #[serde(default)]
    pub server: ListenerConfig,

    /// Metrics listener
    #[serde(default = "ListenerConfig::metrics")]
    pub metrics: ListenerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub quote_source: QuoteSourceConfig,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Upper bound for one leg transaction
    #[serde(default = "default_db_timeout_ms")]
    pub db_timeout_ms: u64,

    /// Grace period before in-flight calls are aborted
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,

    /// Name reported by the health endpoint
    #[serde(default = "default_health_service_name")]
    pub health_service_name: String,

    /// OTLP/HTTP collector base URL
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
}

fn default_db_timeout_ms() -> u64 {
    5_000
}

fn default_shutdown_timeout_ms() -> u64 {
    5_000
}

fn default_health_service_name() -> String {
    "GetRatesUSDT".to_string()
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4318".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ListenerConfig::default(),
            metrics: ListenerConfig::metrics(),
            database: DatabaseConfig::default(),
            quote_source: QuoteSourceConfig::default(),
            log_level: LogLevel::default(),
            log_format: LogFormat::default(),
            db_timeout_ms: default_db_timeout_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            health_service_name: default_health_service_name(),
            otlp_endpoint: default_otlp_endpoint(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build the effective configuration from every layer.
    ///
    /// `env` looks up one variable; empty values count as unset.
    pub fn resolve<F>(args: &CliArgs, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &args.config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env(|key| env(key).filter(|v| !v.trim().is_empty()))?;
        config.apply_args(args)?;
        Ok(config)
    }

    /// Resolve against the process environment
    pub fn from_process_env(args: &CliArgs) -> Result<Self, ConfigError> {
        Self::resolve(args, |key| std::env::var(key).ok())
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env("LOG_LEVEL") {
            self.log_level = parse_value("LOG_LEVEL", &v)?;
        }
        if let Some(v) = env("LOG_FORMAT") {
            self.log_format = parse_value("LOG_FORMAT", &v)?;
        }

        if let Some(v) = env("APP_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env("APP_PORT") {
            self.server.port = parse_value("APP_PORT", &v)?;
        }
        if let Some(v) = env("PROMETHEUS_HOST") {
            self.metrics.host = v;
        }
        if let Some(v) = env("PROMETHEUS_PORT") {
            self.metrics.port = parse_value("PROMETHEUS_PORT", &v)?;
        }

        if let Some(v) = env("POSTGRES_HOST") {
            self.database.host = Some(v);
        }
        if let Some(v) = env("POSTGRES_PORT") {
            self.database.port = Some(parse_value("POSTGRES_PORT", &v)?);
        }
        if let Some(v) = env("POSTGRES_USER") {
            self.database.user = Some(v);
        }
        if let Some(v) = env("POSTGRES_PASSWORD") {
            self.database.password = Some(v);
        }
        if let Some(v) = env("POSTGRES_DB") {
            self.database.name = Some(v);
        }
        if let Some(v) = env("DATABASE_URL") {
            self.database.url = Some(v);
        }

        if let Some(v) = env("QUOTE_SOURCE_URL") {
            self.quote_source.url = v;
        }
        if let Some(v) = env("FETCH_TIMEOUT_MS") {
            self.quote_source.timeout_ms = parse_value("FETCH_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = env("DB_TIMEOUT_MS") {
            self.db_timeout_ms = parse_value("DB_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = env("SHUTDOWN_TIMEOUT_MS") {
            self.shutdown_timeout_ms = parse_value("SHUTDOWN_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = env("HEALTH_SERVICE_NAME") {
            self.health_service_name = v;
        }
        if let Some(v) = env("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.otlp_endpoint = v;
        }

        Ok(())
    }

    fn apply_args(&mut self, args: &CliArgs) -> Result<(), ConfigError> {
        if let Some(host) = non_empty(&args.host) {
            self.database.host = Some(host.to_string());
        }
        if let Some(port) = non_empty(&args.port) {
            self.database.port = Some(parse_value("--port", port)?);
        }
        if let Some(user) = non_empty(&args.user) {
            self.database.user = Some(user.to_string());
        }
        if let Some(dbname) = non_empty(&args.dbname) {
            self.database.name = Some(dbname.to_string());
        }
        if let Some(password) = non_empty(&args.password) {
            self.database.password = Some(password.to_string());
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_source.timeout_ms)
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_millis(self.db_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// A listening socket address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ListenerConfig {
    /// Defaults for the metrics listener
    pub fn metrics() -> Self {
        Self {
            host: default_host(),
            port: 8081,
        }
    }

    /// `host:port`, as accepted by `TcpListener::bind`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// PostgreSQL connection settings.
///
/// `url` wins over the discrete parts when both are present.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            user: None,
            password: None,
            name: None,
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// Whether any database location was given
    pub fn is_configured(&self) -> bool {
        self.url.is_some() || self.host.is_some()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("name", &self.name)
            .field("url", &self.url.as_ref().map(|_| "***"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Upstream depth endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSourceConfig {
    #[serde(default = "default_quote_url")]
    pub url: String,
    #[serde(default = "default_fetch_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_quote_url() -> String {
    "https://garantex.org/api/v2/depth?market=usdtrub".to_string()
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

impl Default for QuoteSourceConfig {
    fn default() -> Self {
        Self {
            url: default_quote_url(),
            timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Filter directives used when `RUST_LOG` is unset
    pub fn directives(&self) -> String {
        format!(
            "rates_service={level},rates_core={level},tower_http=info",
            level = self.as_str()
        )
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Parsed command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub help: bool,
    pub config_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub user: Option<String>,
    pub dbname: Option<String>,
    pub password: Option<String>,
}

impl CliArgs {
    /// Parse arguments, program name excluded
    pub fn parse<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg.clone(), None),
            };

            if flag == "--help" || flag == "-h" {
                parsed.help = true;
                continue;
            }

            let slot = match flag.as_str() {
                "--config" | "-c" => None,
                "--host" => Some(&mut parsed.host),
                "--port" => Some(&mut parsed.port),
                "--user" => Some(&mut parsed.user),
                "--dbname" => Some(&mut parsed.dbname),
                "--password" => Some(&mut parsed.password),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            };

            let value = match inline.or_else(|| args.next()) {
                Some(value) => value,
                None => return Err(ConfigError::MissingArgument(flag)),
            };

            match slot {
                Some(slot) => *slot = Some(value),
                None => parsed.config_path = Some(PathBuf::from(value)),
            }
        }

        Ok(parsed)
    }
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown argument: {0}")]
    UnknownArgument(String),

    #[error("{0} requires a value")]
    MissingArgument(String),
}
