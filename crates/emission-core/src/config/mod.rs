use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::calculation::EngineOptions;
use crate::factors::{UnitPolicy, UNIVERSAL_REGION};

/// Upper bound on decimal places kept on stored emission values.
pub const MAX_RESULT_PRECISION: u32 = 12;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the calculation service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub calculation: CalculationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::parse(
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
            calculation: CalculationConfig::from_env()?,
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

/// Engine defaults and the optional factor file loaded when the service starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationConfig {
    pub default_region: String,
    pub allow_unit_relaxation: bool,
    pub result_precision: u32,
    pub factor_seed_csv: Option<PathBuf>,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            default_region: UNIVERSAL_REGION.to_string(),
            allow_unit_relaxation: false,
            result_precision: 7,
            factor_seed_csv: None,
        }
    }
}

impl CalculationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_region = env::var("CALC_DEFAULT_REGION")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.default_region);

        let allow_unit_relaxation = match env::var("CALC_ALLOW_UNIT_RELAXATION") {
            Ok(raw) => parse_flag("CALC_ALLOW_UNIT_RELAXATION", &raw)?,
            Err(_) => defaults.allow_unit_relaxation,
        };

        let result_precision = match env::var("CALC_RESULT_PRECISION") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|precision| *precision <= MAX_RESULT_PRECISION)
                .ok_or(ConfigError::InvalidPrecision { value: raw })?,
            Err(_) => defaults.result_precision,
        };

        let factor_seed_csv = env::var("FACTOR_SEED_CSV")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            default_region,
            allow_unit_relaxation,
            result_precision,
            factor_seed_csv,
        })
    }

    pub fn to_engine_options(&self) -> EngineOptions {
        EngineOptions {
            default_region: self.default_region.clone(),
            unit_policy: if self.allow_unit_relaxation {
                UnitPolicy::AllowRelaxation
            } else {
                UnitPolicy::ExactOnly
            },
            result_precision: self.result_precision,
        }
    }
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPrecision { value: String },
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPrecision { value } => write!(
                f,
                "CALC_RESULT_PRECISION must be an integer between 0 and {MAX_RESULT_PRECISION}, got '{value}'"
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
            ConfigError::InvalidPort
            | ConfigError::InvalidPrecision { .. }
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}
