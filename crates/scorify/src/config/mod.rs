use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
    pub scheduler: SchedulerConfig,
    pub trigger: TriggerConfig,
    pub data: DataConfig,
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
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        )?;

        let model_version =
            env::var("SCORIFY_MODEL_VERSION").unwrap_or_else(|_| "v1.0".to_string());
        let threshold = parse_threshold(env::var("SCORIFY_THRESHOLD").ok())?;
        let parallel = parse_flag("SCORIFY_PARALLEL_SCORING", false)?;

        let interval_minutes = env::var("SCORIFY_BATCH_INTERVAL_MINUTES")
            .unwrap_or_else(|_| "24".to_string())
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|minutes| *minutes > 0)
            .ok_or(ConfigError::InvalidInterval)?;
        let run_on_startup = parse_flag("SCORIFY_RUN_ON_STARTUP", true)?;

        let token = env::var("SCORIFY_TRIGGER_TOKEN")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let model_path = env::var("SCORIFY_MODEL_PATH").ok().map(PathBuf::from);
        let data_dir = env::var("SCORIFY_DATA_DIR").ok().map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            scoring: ScoringConfig {
                model_version,
                threshold,
                parallel,
            },
            scheduler: SchedulerConfig {
                interval_minutes,
                run_on_startup,
            },
            trigger: TriggerConfig { token },
            data: DataConfig {
                model_path,
                data_dir,
            },
        })
    }
}

fn parse_threshold(raw: Option<String>) -> Result<f64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(ScoringConfig::DEFAULT_THRESHOLD);
    };
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| (0.0..=1.0).contains(value))
        .ok_or(ConfigError::InvalidThreshold(raw))
}

fn parse_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name, value: raw }),
        },
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Full,
}

impl LogFormat {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            _ => Err(ConfigError::InvalidLogFormat(value.to_string())),
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Values fixed for every record a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub model_version: String,
    pub threshold: f64,
    /// Score independent pairs on the rayon pool.
    pub parallel: bool,
}

impl ScoringConfig {
    pub const DEFAULT_THRESHOLD: f64 = 0.5;
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_version: "v1.0".to_string(),
            threshold: Self::DEFAULT_THRESHOLD,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval_minutes: u64,
    pub run_on_startup: bool,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

/// Manual trigger authentication.
#[derive(Debug, Clone, Default)]
pub struct TriggerConfig {
    pub token: Option<String>,
}

/// Optional model and seed data locations.
#[derive(Debug, Clone, Default)]
pub struct DataConfig {
    pub model_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidThreshold(String),
    InvalidInterval,
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'full', got '{value}'")
            }
            ConfigError::InvalidThreshold(value) => {
                write!(f, "SCORIFY_THRESHOLD must be a number in [0, 1], got '{value}'")
            }
            ConfigError::InvalidInterval => write!(
                f,
                "SCORIFY_BATCH_INTERVAL_MINUTES must be a positive whole number"
            ),
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
