//! Configuration loading and resolution
//!
//! Bootstrap configuration comes from a TOML file with every field
//! defaulted. Values are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`MEALDB_*`)
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not an error. An unreadable or unparsable file,
//! or a value that cannot be used to reach the store, is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file looked up in the working directory
pub const CONFIG_FILENAME: &str = "mealdb.toml";

/// Default SQLite database file
pub const DEFAULT_SQLITE_PATH: &str = "mealdb_etl.db";

/// Default remote API root
pub const DEFAULT_API_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1";

/// Default dashboard listen address
pub const DEFAULT_DASHBOARD_BIND: &str = "127.0.0.1:5730";

pub const ENV_CONFIG_PATH: &str = "MEALDB_CONFIG";
pub const ENV_DB_ENGINE: &str = "MEALDB_DB_ENGINE";
pub const ENV_SQLITE_PATH: &str = "MEALDB_SQLITE_PATH";
pub const ENV_DB_HOST: &str = "MEALDB_DB_HOST";
pub const ENV_DB_PORT: &str = "MEALDB_DB_PORT";
pub const ENV_DB_USER: &str = "MEALDB_DB_USER";
pub const ENV_DB_PASSWORD: &str = "MEALDB_DB_PASSWORD";
pub const ENV_DB_NAME: &str = "MEALDB_DB_NAME";
pub const ENV_BATCH_SIZE: &str = "MEALDB_BATCH_SIZE";
pub const ENV_API_BASE_URL: &str = "MEALDB_API_BASE_URL";
pub const ENV_LOG_LEVEL: &str = "MEALDB_LOG_LEVEL";

/// Storage engine selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngine {
    /// Embedded SQLite file (default)
    #[default]
    Sqlite,
    /// Networked MySQL server
    Mysql,
}

impl std::str::FromStr for StorageEngine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StorageEngine::Sqlite),
            "mysql" => Ok(StorageEngine::Mysql),
            other => Err(Error::Config(format!(
                "Unknown storage engine: {}. Use 'sqlite' or 'mysql'.",
                other
            ))),
        }
    }
}

impl std::fmt::Display for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageEngine::Sqlite => write!(f, "sqlite"),
            StorageEngine::Mysql => write!(f, "mysql"),
        }
    }
}

/// `[database]` section: engine choice and connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub engine: StorageEngine,
    /// SQLite file path (sqlite engine only)
    pub sqlite_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Database name (mysql engine only)
    pub name: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            engine: StorageEngine::default(),
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            host: "localhost".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            name: "mealdb_etl".to_string(),
        }
    }
}

impl DatabaseSection {
    /// Connection URL understood by sqlx for the selected engine
    pub fn connection_url(&self) -> String {
        match self.engine {
            // mode=rwc: read, write, create
            StorageEngine::Sqlite => format!("sqlite://{}?mode=rwc", self.sqlite_path.display()),
            StorageEngine::Mysql => {
                let credentials = if self.password.is_empty() {
                    urlencoding::encode(&self.user).into_owned()
                } else {
                    format!(
                        "{}:{}",
                        urlencoding::encode(&self.user),
                        urlencoding::encode(&self.password)
                    )
                };
                format!(
                    "mysql://{}@{}:{}/{}",
                    credentials, self.host, self.port, self.name
                )
            }
        }
    }

    /// Connection target safe to log (no password)
    pub fn display_target(&self) -> String {
        match self.engine {
            StorageEngine::Sqlite => format!("sqlite:{}", self.sqlite_path.display()),
            StorageEngine::Mysql => format!(
                "mysql://{}@{}:{}/{}",
                self.user, self.host, self.port, self.name
            ),
        }
    }
}

/// `[api]` section: remote recipe API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Minimum spacing between requests in milliseconds (0 disables pacing)
    pub request_interval_ms: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: 30,
            request_interval_ms: 0,
        }
    }
}

/// `[etl]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlSection {
    /// Default record count for random-draw runs
    pub batch_size: usize,
}

impl Default for EtlSection {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

/// `[dashboard]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSection {
    pub bind: String,
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_DASHBOARD_BIND.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Bootstrap configuration (`mealdb.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub database: DatabaseSection,
    pub api: ApiSection,
    pub etl: EtlSection,
    pub dashboard: DashboardSection,
    pub logging: LoggingConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub engine: Option<StorageEngine>,
    pub sqlite_path: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub log_level: Option<String>,
    pub dashboard_bind: Option<String>,
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a TOML config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read config file {} failed: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `MEALDB_*` environment variables on top of file values
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(engine) = env_value(ENV_DB_ENGINE) {
            self.database.engine = engine.parse()?;
        }
        if let Some(path) = env_value(ENV_SQLITE_PATH) {
            self.database.sqlite_path = PathBuf::from(path);
        }
        if let Some(host) = env_value(ENV_DB_HOST) {
            self.database.host = host;
        }
        if let Some(port) = env_value(ENV_DB_PORT) {
            self.database.port = port.parse().map_err(|_| {
                Error::Config(format!("{} must be a port number, got '{}'", ENV_DB_PORT, port))
            })?;
        }
        if let Some(user) = env_value(ENV_DB_USER) {
            self.database.user = user;
        }
        // An empty password is legitimate, so read it without filtering
        if let Ok(password) = std::env::var(ENV_DB_PASSWORD) {
            self.database.password = password;
        }
        if let Some(name) = env_value(ENV_DB_NAME) {
            self.database.name = name;
        }
        if let Some(size) = env_value(ENV_BATCH_SIZE) {
            self.etl.batch_size = size.parse().map_err(|_| {
                Error::Config(format!("{} must be a number, got '{}'", ENV_BATCH_SIZE, size))
            })?;
        }
        if let Some(url) = env_value(ENV_API_BASE_URL) {
            self.api.base_url = url;
        }
        if let Some(level) = env_value(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Apply command-line values (highest priority)
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(engine) = overrides.engine {
            self.database.engine = engine;
        }
        if let Some(path) = &overrides.sqlite_path {
            self.database.sqlite_path = path.clone();
        }
        if let Some(size) = overrides.batch_size {
            self.etl.batch_size = size;
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(bind) = &overrides.dashboard_bind {
            self.dashboard.bind = bind.clone();
        }
    }

    /// Reject values that cannot be used to start a run
    pub fn validate(&self) -> Result<()> {
        if self.etl.batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than zero".to_string()));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Config("api.base_url must not be empty".to_string()));
        }
        match self.database.engine {
            StorageEngine::Sqlite => {
                if self.database.sqlite_path.as_os_str().is_empty() {
                    return Err(Error::Config(
                        "database.sqlite_path must not be empty".to_string(),
                    ));
                }
            }
            StorageEngine::Mysql => {
                if self.database.host.trim().is_empty() {
                    return Err(Error::Config("database.host must not be empty".to_string()));
                }
                if self.database.name.trim().is_empty() {
                    return Err(Error::Config("database.name must not be empty".to_string()));
                }
                if self.database.port == 0 {
                    return Err(Error::Config("database.port must not be zero".to_string()));
                }
            }
        }
        Ok(())
    }
}

/// Locate the config file to read, if any
///
/// Priority: CLI path, `MEALDB_CONFIG`, `./mealdb.toml`, then the platform
/// config directory (`<config_dir>/mealdb/config.toml`). Explicit paths are
/// returned even when missing so the read reports the error.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = env_value(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|d| d.join("mealdb").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load configuration with full priority resolution
pub fn load_config(overrides: &ConfigOverrides) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(overrides.config_path.as_deref()) {
        Some(path) => TomlConfig::load_file(&path)?,
        None => {
            debug!("No config file found, using defaults");
            TomlConfig::default()
        }
    };

    config.apply_env()?;
    config.apply_overrides(overrides);
    config.validate()?;

    Ok(config)
}

/// Non-empty environment variable value
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
