// HTTP retrieval for the real-time position feed
use crate::sst_config::TrackerConfig;
use crate::sst_models::{Result, TrackerError};
use log::{debug, warn};
use reqwest::Client;
use std::fmt;
use url::Url;

/// One way of reaching the feed. Strategies are tried in order until one
/// produces an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalStrategy {
    /// Forward through a CORS relay: `GET <endpoint>?url=<target>`
    Relay { endpoint: String },
    /// Request the target URL itself
    Direct,
}

impl RetrievalStrategy {
    pub fn request_url(&self, target: &Url) -> Result<Url> {
        match self {
            RetrievalStrategy::Relay { endpoint } => {
                Url::parse_with_params(endpoint, &[("url", target.as_str())]).map_err(|e| {
                    TrackerError::ConfigError(format!("Invalid relay endpoint '{}': {}", endpoint, e))
                })
            }
            RetrievalStrategy::Direct => Ok(target.clone()),
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalStrategy::Relay { endpoint } => write!(f, "relay {}", endpoint),
            RetrievalStrategy::Direct => write!(f, "direct"),
        }
    }
}

#[derive(Debug)]
pub struct Requester {
    client: Client,
    base_url: Url,
    strategies: Vec<RetrievalStrategy>,
}

impl Requester {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        Self::with_strategies(&config.base_url, config.strategies())
    }

    pub fn with_strategies(base_url: &str, strategies: Vec<RetrievalStrategy>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TrackerError::ConfigError(format!("Invalid base URL '{}': {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(TrackerError::ConfigError(format!(
                "Base URL '{}' cannot take a path",
                base_url
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("sst/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrackerError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Requester {
            client,
            base_url,
            strategies,
        })
    }

    /// Base URL with `line` percent-encoded as the last path segment.
    pub fn target_url(&self, line: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(line);
        }
        url
    }

    /// Fetch the raw XML for `line`.
    ///
    /// A strategy that fails before producing a response hands over to the
    /// next one. The first response ends the sequence, and a non-success
    /// status on it is an error.
    pub async fn fetch(&self, line: &str) -> Result<String> {
        let target = self.target_url(line);
        let mut last_error = None;

        for strategy in &self.strategies {
            let url = strategy.request_url(&target)?;
            debug!("Requesting {} via {}", target, strategy);

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(TrackerError::HttpStatus(status.as_u16()));
                    }

                    return response
                        .text()
                        .await
                        .map_err(|e| TrackerError::NetworkError(format!("Failed to read response: {}", e)));
                }
                Err(e) => {
                    warn!("Request via {} failed: {}", strategy, e);
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => TrackerError::NetworkError(format!("Failed to fetch {}: {}", target, e)),
            None => TrackerError::ConfigError("No retrieval strategy configured".to_string()),
        })
    }
}
