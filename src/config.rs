//! Configuration module for fileshelf.

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{Result, ShelfError};

/// Environment variable selecting the runtime environment.
pub const ENV_VAR: &str = "APP_ENV";

/// Legacy name of [`ENV_VAR`], still honoured.
pub const LEGACY_ENV_VAR: &str = "ENV";

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDialect {
    /// SQLite file database.
    #[default]
    Sqlite,
    /// PostgreSQL server.
    Postgres,
    /// MySQL or MariaDB server.
    Mysql,
}

impl DatabaseDialect {
    /// Dialect name as used in configuration and `DB_CONNECTION`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseDialect::Sqlite => "sqlite",
            DatabaseDialect::Postgres => "postgres",
            DatabaseDialect::Mysql => "mysql",
        }
    }

    /// Default server port for networked dialects.
    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseDialect::Mysql => 3306,
            _ => 5432,
        }
    }

    /// The dialect this binary was compiled for.
    pub fn compiled() -> Self {
        #[cfg(feature = "postgres")]
        {
            DatabaseDialect::Postgres
        }
        #[cfg(feature = "mysql")]
        {
            DatabaseDialect::Mysql
        }
        #[cfg(not(any(feature = "postgres", feature = "mysql")))]
        {
            DatabaseDialect::Sqlite
        }
    }
}

impl fmt::Display for DatabaseDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseDialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(DatabaseDialect::Sqlite),
            "postgres" | "postgresql" | "pgsql" => Ok(DatabaseDialect::Postgres),
            "mysql" | "mariadb" => Ok(DatabaseDialect::Mysql),
            _ => Err(format!("unsupported database dialect: {s}")),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database dialect.
    #[serde(default)]
    pub dialect: DatabaseDialect,
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Database server host.
    #[serde(default = "default_db_host")]
    pub host: String,
    /// Database server port (dialect default when unset).
    #[serde(default)]
    pub port: Option<u16>,
    /// Database user.
    #[serde(default)]
    pub username: String,
    /// Database password.
    #[serde(default)]
    pub password: String,
    /// Database name.
    #[serde(default = "default_db_name")]
    pub name: String,
    /// Maximum pool connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/fileshelf.db".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_name() -> String {
    "fileshelf".to_string()
}

fn default_max_connections() -> u32 {
    8
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dialect: DatabaseDialect::default(),
            path: default_db_path(),
            host: default_db_host(),
            port: None,
            username: String::new(),
            password: String::new(),
            name: default_db_name(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// Server port, falling back to the dialect's default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.dialect.default_port())
    }

    /// Build the sqlx connection URL for the configured dialect.
    pub fn url(&self) -> String {
        let scheme = match self.dialect {
            DatabaseDialect::Sqlite => return format!("sqlite://{}?mode=rwc", self.path),
            DatabaseDialect::Postgres => "postgres",
            DatabaseDialect::Mysql => "mysql",
        };
        format!(
            "{}://{}:{}@{}:{}/{}",
            scheme,
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.password),
            self.host,
            self.port(),
            self.name
        )
    }
}

const BYTES_PER_MB: u64 = 1024 * 1024;

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Root directory uploads are written under.
    #[serde(default = "default_upload_root")]
    pub upload_root: String,
    /// Public static directory, also the retrieval fallback.
    #[serde(default = "default_public_path")]
    pub public_path: String,
    /// Maximum upload size in megabytes, applied to every upload path.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_upload_root() -> String {
    "public/uploads".to_string()
}

fn default_public_path() -> String {
    "public".to_string()
}

fn default_max_upload_size() -> u64 {
    5
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            upload_root: default_upload_root(),
            public_path: default_public_path(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

impl FilesConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(BYTES_PER_MB)
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Prefix all API routes are nested under.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Allowed CORS origins (empty = allow any).
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Whether to serve the public directory under `/public`.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_serve_static() -> bool {
    true
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            api_prefix: default_api_prefix(),
            cors_origins: vec![],
            serve_static: default_serve_static(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, written in addition to stdout.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ShelfError::Io)?;
        Self::parse(&content)
    }

    /// Build the runtime configuration.
    ///
    /// Outside production the local file at `path` is read when present;
    /// in production only defaults and environment variables are used.
    pub fn from_environment<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = if is_production() || !path.as_ref().exists() {
            Self::default()
        } else {
            Self::load(path)?
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShelfError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables: `PORT`, `DB_CONNECTION`, `DB_HOST`,
    /// `DB_PORT`, `DB_USERNAME`, `DB_PASSWORD`, `DB_DATABASE`,
    /// `FILESHELF_UPLOAD_ROOT`. Empty values are ignored; values that do
    /// not parse are an error.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(env_value)
    }

    /// Apply overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(dialect) = lookup("DB_CONNECTION") {
            self.database.dialect = dialect.parse().map_err(ShelfError::Config)?;
        }
        if let Some(host) = lookup("DB_HOST") {
            self.database.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            self.database.port = Some(parse_env("DB_PORT", &port)?);
        }
        if let Some(username) = lookup("DB_USERNAME") {
            self.database.username = username;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.database.password = password;
        }
        if let Some(name) = lookup("DB_DATABASE") {
            // For SQLite the database name is the file path.
            match self.database.dialect {
                DatabaseDialect::Sqlite => self.database.path = name,
                DatabaseDialect::Postgres | DatabaseDialect::Mysql => self.database.name = name,
            }
        }
        if let Some(root) = lookup("FILESHELF_UPLOAD_ROOT") {
            self.files.upload_root = root;
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The configured dialect is not the one this binary was built for
    /// - The upload size limit is zero or does not fit in memory
    /// - The API prefix does not start with `/`
    pub fn validate(&self) -> Result<()> {
        let compiled = DatabaseDialect::compiled();
        if self.database.dialect != compiled {
            return Err(ShelfError::Config(format!(
                "database dialect '{}' is not supported by this build (built for '{}')",
                self.database.dialect, compiled
            )));
        }
        if self.files.max_upload_size_mb == 0 {
            return Err(ShelfError::Config(
                "files.max_upload_size_mb must be greater than zero".to_string(),
            ));
        }
        let fits = self
            .files
            .max_upload_size_mb
            .checked_mul(BYTES_PER_MB)
            .is_some_and(|bytes| usize::try_from(bytes).is_ok());
        if !fits {
            return Err(ShelfError::Config(format!(
                "files.max_upload_size_mb is too large: {}",
                self.files.max_upload_size_mb
            )));
        }
        if !self.web.api_prefix.starts_with('/') {
            return Err(ShelfError::Config(format!(
                "web.api_prefix must start with '/': {}",
                self.web.api_prefix
            )));
        }
        Ok(())
    }
}

/// Whether the service runs in production mode.
pub fn is_production() -> bool {
    env_value(ENV_VAR)
        .or_else(|| env_value(LEGACY_ENV_VAR))
        .is_some_and(|v| v.eq_ignore_ascii_case("production"))
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env(key: &str, value: &str) -> Result<u16> {
    value
        .parse()
        .map_err(|_| ShelfError::Config(format!("invalid {key}: {value}")))
}
