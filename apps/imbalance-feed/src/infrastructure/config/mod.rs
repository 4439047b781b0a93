//! Configuration Module
//!
//! Configuration loading for the feed.

mod settings;

pub use settings::{
    ChartSettings, ConfigError, FeedConfig, HISTORICAL_LOG_VAR, LIVE_LOG_VAR, LogPaths,
    ServerSettings, TimingSettings,
};
