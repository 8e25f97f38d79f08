use shared::{Framing, DEFAULT_BATCH_MAX_SIZE, DEFAULT_POLL_DELAY_SECS, MAX_BATCH_SIZE};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    pub data: DataConfig,
    pub logging: LoggingConfig,
    pub metrics_port: Option<u16>,
}

/// Session settings shared by every phase of a run
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub id: String,
    pub server_address: String,
    /// Maximum winners requests; 0 polls until the draw is held
    pub loop_amount: u32,
    /// Pause between winners requests
    pub loop_period: Duration,
    pub batch_max_size: usize,
    pub framing: Framing,
}

#[derive(Debug, Clone)]
pub struct DataConfig {
    pub file: PathBuf,
    /// Valid bets to skip before sending, to resume an interrupted run
    pub start_offset: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl ClientConfig {
    pub fn new(id: impl Into<String>, server_address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            server_address: server_address.into(),
            loop_amount: 0,
            loop_period: Duration::from_secs(DEFAULT_POLL_DELAY_SECS),
            batch_max_size: DEFAULT_BATCH_MAX_SIZE,
            framing: Framing::default(),
        }
    }
}

impl LoggingConfig {
    /// Logging settings alone, so logging can start before the full load
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            level: lookup("CLI_LOG_LEVEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "info".to_string()),
            json: lookup("LOG_FORMAT")
                .map(|v| v.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let id = get("CLI_ID").ok_or(ConfigError::Missing("CLI_ID"))?;
        let server_address = get("CLI_SERVER_ADDRESS").ok_or(ConfigError::Missing("CLI_SERVER_ADDRESS"))?;

        let loop_amount = parse_var("CLI_LOOP_AMOUNT", get("CLI_LOOP_AMOUNT"), 0u32)?;
        let loop_period = match get("CLI_LOOP_PERIOD") {
            Some(value) => parse_duration(&value).map_err(|reason| ConfigError::Invalid {
                var: "CLI_LOOP_PERIOD",
                value,
                reason,
            })?,
            None => Duration::from_secs(DEFAULT_POLL_DELAY_SECS),
        };

        let batch_max_size = parse_var("CLI_BATCH_MAXAMOUNT", get("CLI_BATCH_MAXAMOUNT"), DEFAULT_BATCH_MAX_SIZE)?;
        if !(1..=MAX_BATCH_SIZE).contains(&batch_max_size) {
            return Err(ConfigError::Invalid {
                var: "CLI_BATCH_MAXAMOUNT",
                value: batch_max_size.to_string(),
                reason: format!("must be between 1 and {}", MAX_BATCH_SIZE),
            });
        }

        let framing = match get("CLI_FRAMING") {
            Some(value) => value.parse::<Framing>().map_err(|reason| ConfigError::Invalid {
                var: "CLI_FRAMING",
                value,
                reason,
            })?,
            None => Framing::default(),
        };
        if !framing.supports_multi_record() && batch_max_size > 1 {
            return Err(ConfigError::Invalid {
                var: "CLI_BATCH_MAXAMOUNT",
                value: batch_max_size.to_string(),
                reason: format!("{} framing carries one bet per message", framing),
            });
        }

        let metrics_port = match get("CLI_METRICS_PORT") {
            Some(value) => Some(parse_var("CLI_METRICS_PORT", Some(value), 0u16)?),
            None => None,
        };

        Ok(Config {
            client: ClientConfig {
                id: id.trim().to_string(),
                server_address: server_address.trim().to_string(),
                loop_amount,
                loop_period,
                batch_max_size,
                framing,
            },
            data: DataConfig {
                file: PathBuf::from(get("CLI_DATA_FILE").unwrap_or_else(|| "./agency.csv".to_string())),
                start_offset: parse_var("CLI_START_OFFSET", get("CLI_START_OFFSET"), 0usize)?,
            },
            logging: LoggingConfig::from_lookup(&lookup),
            metrics_port,
        })
    }

    /// Emit the loaded settings as one status line
    pub fn log_summary(&self) {
        tracing::info!(
            action = "config",
            result = "success",
            client_id = %self.client.id,
            server_address = %self.client.server_address,
            loop_amount = self.client.loop_amount,
            loop_period_ms = self.client.loop_period.as_millis() as u64,
            batch_max_size = self.client.batch_max_size,
            framing = %self.client.framing,
            data_file = %self.data.file.display(),
            start_offset = self.data.start_offset,
            log_level = %self.logging.level,
        );
    }
}

fn parse_var<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = value else {
        return Ok(default);
    };
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

/// Parse durations such as `5s`, `250ms`, `1m30s` or a bare number of seconds
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut rest = value;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("expected a number in '{}'", value));
        }
        let amount: u64 = rest[..digits].parse().map_err(|e| format!("{}", e))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount * 60),
            "h" => Duration::from_secs(amount * 3600),
            "" => return Err(format!("missing unit in '{}'", value)),
            unit => return Err(format!("unknown unit '{}'", unit)),
        };
        total += part;
        rest = &rest[unit_len..];
    }
    Ok(total)
}
