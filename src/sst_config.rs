// Command line and environment configuration
use crate::sst_controllers::Poller;
use crate::sst_models::{DEFAULT_LINE, Result, TrackerError};
use crate::sst_requester::RetrievalStrategy;
use clap::Parser;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str =
    "http://swopenapi.seoul.go.kr/api/subway/sample/xml/realtimePosition/0/5/";
pub const DEFAULT_RELAY_URL: &str = "https://api.allorigins.win/raw";
pub const DEFAULT_INTERVAL_SECS: u64 = Poller::DEFAULT_INTERVAL.as_secs();

/// Real-time Seoul subway train positions
#[derive(Debug, Clone, Parser)]
#[command(name = "sst", version)]
pub struct TrackerConfig {
    /// Position feed base URL; the line name is appended as the last path segment
    #[arg(long, env = "SUBWAY_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// CORS relay endpoint tried before the direct request
    #[arg(long, env = "SUBWAY_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    pub relay_url: String,

    /// Skip the relay and always request the feed directly
    #[arg(long)]
    pub no_relay: bool,

    /// Initially selected line
    #[arg(short, long, env = "SUBWAY_LINE", default_value = DEFAULT_LINE)]
    pub line: String,

    /// Auto refresh interval in seconds
    #[arg(long = "interval", env = "SUBWAY_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// Start auto refresh right away
    #[arg(short, long)]
    pub watch: bool,

    /// Search the selected line once and exit
    #[arg(long)]
    pub once: bool,

    /// With --once, print the result as JSON
    #[arg(long, requires = "once")]
    pub json: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            no_relay: false,
            line: DEFAULT_LINE.to_string(),
            interval_secs: DEFAULT_INTERVAL_SECS,
            watch: false,
            once: false,
            json: false,
        }
    }
}

impl TrackerConfig {
    /// Retrieval order: relay first (unless disabled), then direct.
    pub fn strategies(&self) -> Vec<RetrievalStrategy> {
        let mut strategies = Vec::with_capacity(2);
        if !self.no_relay {
            strategies.push(RetrievalStrategy::Relay {
                endpoint: self.relay_url.clone(),
            });
        }
        strategies.push(RetrievalStrategy::Direct);
        strategies
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Line to preselect; blank means no selection.
    pub fn initial_line(&self) -> Option<String> {
        let line = self.line.trim();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(TrackerError::ConfigError("base_url must not be empty".to_string()));
        }

        if !self.no_relay && self.relay_url.trim().is_empty() {
            return Err(TrackerError::ConfigError(
                "relay_url must not be empty (use --no-relay to disable it)".to_string(),
            ));
        }

        if self.interval_secs == 0 {
            return Err(TrackerError::ConfigError(
                "interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
