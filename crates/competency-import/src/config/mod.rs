use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::outcomes::{AllocationOrder, ContextId, ImportOptions};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub catalog: CatalogConfig,
    pub import: ImportConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let outcomes_csv = non_empty_var("APP_OUTCOMES_CSV").map(PathBuf::from);
        let scales_csv = non_empty_var("APP_SCALES_CSV").map(PathBuf::from);
        if outcomes_csv.is_some() != scales_csv.is_some() {
            return Err(ConfigError::IncompleteCatalog);
        }

        let context_id = match non_empty_var("APP_CONTEXT_ID") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(ContextId)
                .map_err(|_| ConfigError::InvalidContextId)?,
            None => ContextId(1),
        };

        let idnumber_order = match non_empty_var("APP_IDNUMBER_ORDER") {
            Some(raw) => raw
                .parse::<AllocationOrder>()
                .map_err(|_| ConfigError::InvalidIdnumberOrder { value: raw })?,
            None => AllocationOrder::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            catalog: CatalogConfig {
                outcomes_csv,
                scales_csv,
            },
            import: ImportConfig {
                context_id,
                idnumber_order,
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Locations of the outcome and scale CSV exports.
///
/// Either both are set or neither; without them the service starts with an
/// empty catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub outcomes_csv: Option<PathBuf>,
    pub scales_csv: Option<PathBuf>,
}

impl CatalogConfig {
    pub fn paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.outcomes_csv.as_ref().zip(self.scales_csv.as_ref())
    }
}

#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Context new frameworks are created in.
    pub context_id: ContextId,
    pub idnumber_order: AllocationOrder,
}

impl ImportConfig {
    pub fn options(&self) -> ImportOptions {
        ImportOptions {
            idnumber_order: self.idnumber_order,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidContextId,
    InvalidIdnumberOrder { value: String },
    IncompleteCatalog,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidContextId => write!(f, "APP_CONTEXT_ID must be a valid u64"),
            ConfigError::InvalidIdnumberOrder { value } => write!(
                f,
                "APP_IDNUMBER_ORDER must be 'selection' or 'repository', got '{value}'"
            ),
            ConfigError::IncompleteCatalog => write!(
                f,
                "APP_OUTCOMES_CSV and APP_SCALES_CSV must be set together"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidContextId
            | ConfigError::InvalidIdnumberOrder { .. }
            | ConfigError::IncompleteCatalog => None,
        }
    }
}
