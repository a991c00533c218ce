use std::env;
use std::str::FromStr;

/// 25 MB
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// Files on disk, served under `/files`
    Local,
    /// Process memory, not served
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::UnknownStorageBackend(other.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub storage_backend: StorageBackend,
    pub storage_path: String,
    pub public_base_url: String,
    pub max_upload_bytes: usize,
    pub collaborator_timeout_secs: u64,
    pub otel_exporter_endpoint: Option<String>,
    pub service_name: String,
    pub metrics_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://postboard.db?mode=rwc".to_string());

        let server_host = var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let server_port = var("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let storage_backend = var("STORAGE_BACKEND")
            .unwrap_or_else(|| "local".to_string())
            .parse()?;

        let storage_path = var("STORAGE_PATH").unwrap_or_else(|| "./storage".to_string());

        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", server_port));

        let max_upload_bytes = parse_number(&var, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        let collaborator_timeout_secs: u64 =
            parse_number(&var, "COLLABORATOR_TIMEOUT_SECS", 30)?;
        if collaborator_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let otel_exporter_endpoint = var("OTEL_EXPORTER_OTLP_ENDPOINT");

        let service_name = var("SERVICE_NAME").unwrap_or_else(|| "postboard".to_string());

        let metrics_port = var("METRICS_PORT")
            .map(|port| port.parse().map_err(|_| ConfigError::InvalidPort))
            .transpose()?;

        Ok(Config {
            database_url,
            server_host,
            server_port,
            storage_backend,
            storage_path,
            public_base_url,
            max_upload_bytes,
            collaborator_timeout_secs,
            otel_exporter_endpoint,
            service_name,
            metrics_port,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_number<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
        None => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("COLLABORATOR_TIMEOUT_SECS must be at least 1")]
    ZeroTimeout,

    #[error("Unknown storage backend {0:?}, expected \"local\" or \"memory\"")]
    UnknownStorageBackend(String),
}
