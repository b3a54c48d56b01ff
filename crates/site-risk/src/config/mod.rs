use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::resources::ArtifactKind;
use crate::workflows::risk::PredictionStrategy;

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
    pub risk: RiskConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            risk: RiskConfig::from_env()?,
        })
    }
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the risk artifacts live and how predictions are produced.
#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub strategy: PredictionStrategy,
    pub artifact_dir: PathBuf,
    /// Score used when the risk table has no entry for a predicted label.
    pub default_score: f64,
    /// Google Drive file ids used to fetch artifacts missing from `artifact_dir`.
    pub drive_file_ids: BTreeMap<ArtifactKind, String>,
    /// Service-account key file authorizing the Drive downloads.
    pub drive_credentials: Option<PathBuf>,
}

impl RiskConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_strategy = env::var("RISK_STRATEGY").unwrap_or_else(|_| "rules".to_string());
        let strategy = PredictionStrategy::parse(&raw_strategy)
            .ok_or(ConfigError::InvalidStrategy { value: raw_strategy })?;

        let artifact_dir = env::var("RISK_ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("artifacts"));

        let default_score = match env::var("RISK_DEFAULT_SCORE") {
            Ok(raw) => parse_default_score(&raw)?,
            Err(_) => 0.0,
        };

        let mut drive_file_ids = BTreeMap::new();
        for kind in ArtifactKind::ALL {
            if let Ok(id) = env::var(kind.drive_env_var()) {
                let id = id.trim();
                if !id.is_empty() {
                    drive_file_ids.insert(kind, id.to_string());
                }
            }
        }

        let drive_credentials = env::var("RISK_DRIVE_CREDENTIALS")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);
        if !drive_file_ids.is_empty() && drive_credentials.is_none() {
            return Err(ConfigError::MissingDriveCredentials);
        }

        Ok(Self {
            strategy,
            artifact_dir,
            default_score,
            drive_file_ids,
            drive_credentials,
        })
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            strategy: PredictionStrategy::RuleBased,
            artifact_dir: PathBuf::from("artifacts"),
            default_score: 0.0,
            drive_file_ids: BTreeMap::new(),
            drive_credentials: None,
        }
    }
}

fn parse_default_score(raw: &str) -> Result<f64, ConfigError> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && (0.0..=100.0).contains(&value) => Ok(value),
        _ => Err(ConfigError::InvalidDefaultScore {
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidStrategy { value: String },
    InvalidDefaultScore { value: String },
    MissingDriveCredentials,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidStrategy { value } => write!(
                f,
                "RISK_STRATEGY must be 'rules' or 'classifier' (got '{value}')"
            ),
            ConfigError::InvalidDefaultScore { value } => write!(
                f,
                "RISK_DEFAULT_SCORE must be a percentage between 0 and 100 (got '{value}')"
            ),
            ConfigError::MissingDriveCredentials => write!(
                f,
                "RISK_DRIVE_CREDENTIALS must name a service-account key when drive file ids are set"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidStrategy { .. }
            | ConfigError::InvalidDefaultScore { .. }
            | ConfigError::MissingDriveCredentials => None,
        }
    }
}
