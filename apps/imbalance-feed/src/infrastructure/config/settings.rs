//! Feed Configuration Settings
//!
//! Configuration types for the feed, loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::application::services::PumpSettings;
use crate::domain::chart::ChartParams;

/// Variable naming the historical log.
pub const HISTORICAL_LOG_VAR: &str = "IMBALANCE_HISTORICAL_LOG";

/// Variable naming the live log.
pub const LIVE_LOG_VAR: &str = "IMBALANCE_LIVE_LOG";

/// Paths of the two logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    /// Cumulative historical log, read from its start.
    pub historical: PathBuf,
    /// Session-framed live log, read from its end at startup.
    pub live: PathBuf,
}

/// Chart transform settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSettings {
    /// Price tick.
    pub tick: f32,
    /// Timestamp multiplier.
    pub time_factor: i64,
    /// Bar period before the time factor is applied.
    pub period_secs: f64,
    /// Imbalance highlight threshold.
    pub highlight_threshold: f32,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            tick: 0.25,
            time_factor: 1,
            period_secs: 300.0,
            highlight_threshold: 3.0,
        }
    }
}

impl ChartSettings {
    /// Bar period in scaled time units.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn effective_period(&self) -> f64 {
        self.period_secs * self.time_factor as f64
    }
}

/// Polling cadence settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSettings {
    /// Sleep between pump iterations.
    pub poll_interval: Duration,
    /// Delay between attempts to complete a partial line.
    pub line_retry: Duration,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            line_retry: Duration::from_millis(500),
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Health check and metrics HTTP port (0 = disabled).
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete feed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Log file paths.
    pub logs: LogPaths,
    /// Chart transform settings.
    pub chart: ChartSettings,
    /// Polling cadence.
    pub timing: TimingSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a log path is missing or empty, or if the tick
    /// or effective period is not positive.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`FeedConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let logs = LogPaths {
            historical: required_path(&lookup, HISTORICAL_LOG_VAR)?,
            live: required_path(&lookup, LIVE_LOG_VAR)?,
        };

        let defaults = ChartSettings::default();
        let chart = ChartSettings {
            tick: parse_var(&lookup, "IMBALANCE_TICK", defaults.tick),
            time_factor: parse_var(&lookup, "IMBALANCE_TIME_FACTOR", defaults.time_factor),
            period_secs: parse_var(&lookup, "IMBALANCE_PERIOD_SECS", defaults.period_secs),
            highlight_threshold: parse_var(
                &lookup,
                "IMBALANCE_HIGHLIGHT_THRESHOLD",
                defaults.highlight_threshold,
            ),
        };

        if !(chart.tick.is_finite() && chart.tick > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "IMBALANCE_TICK".to_string(),
                reason: format!("tick must be positive, got {}", chart.tick),
            });
        }

        let period = chart.effective_period();
        if !(period.is_finite() && period > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "IMBALANCE_PERIOD_SECS".to_string(),
                reason: format!(
                    "period_secs * time_factor must be positive, got {} * {}",
                    chart.period_secs, chart.time_factor
                ),
            });
        }

        let timing = TimingSettings {
            poll_interval: parse_duration_millis(
                &lookup,
                "IMBALANCE_POLL_INTERVAL_MS",
                TimingSettings::default().poll_interval,
            ),
            line_retry: parse_duration_millis(
                &lookup,
                "IMBALANCE_LINE_RETRY_MS",
                TimingSettings::default().line_retry,
            ),
        };

        let server = ServerSettings {
            health_port: parse_var(
                &lookup,
                "IMBALANCE_HEALTH_PORT",
                ServerSettings::default().health_port,
            ),
        };

        Ok(Self {
            logs,
            chart,
            timing,
            server,
        })
    }

    /// Parameters for the chart transform.
    #[must_use]
    pub fn chart_params(&self) -> ChartParams {
        ChartParams {
            tick: self.chart.tick,
            time_factor: self.chart.time_factor,
            period: self.chart.effective_period(),
            highlight_threshold: self.chart.highlight_threshold,
            ..ChartParams::default()
        }
    }

    /// Settings for the update pump.
    #[must_use]
    pub const fn pump_settings(&self) -> PumpSettings {
        PumpSettings {
            poll_interval: self.timing.poll_interval,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable has a value the feed cannot run with.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

fn required_path<F>(lookup: &F, key: &str) -> Result<PathBuf, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(PathBuf::from(value))
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_duration_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
