use std::time::Duration;

use reqwest::Url;

/// Default upper bound for one grading call. Graders are slow.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for relay setup and single delivery attempts.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The configured webhook URL is not an absolute http(s) URL.
    #[error("Invalid grading webhook URL '{0}'")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    /// The request failed (network, DNS, timeout, body read).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The grader answered with a non-2xx status code.
    #[error("Grading webhook returned HTTP {0}")]
    HttpStatus(u16),

    /// The grader answered 2xx but the body could not be read.
    #[error("Failed to read grading reply (HTTP {status}): {source}")]
    Body { status: u16, source: reqwest::Error },
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Where and how long to wait for the grader.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    url: Url,
    timeout: Duration,
}

impl RelayConfig {
    /// Validate `url` and build a config.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RelayError> {
        let parsed =
            Url::parse(url.trim()).map_err(|_| RelayError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(RelayError::InvalidUrl(url.to_string()));
        }
        Ok(Self {
            url: parsed,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

// ---------------------------------------------------------------------------
// RawReply
// ---------------------------------------------------------------------------

/// What the grader sent back, uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReply {
    /// HTTP status, absent when no response was received.
    pub status_code: Option<u16>,
    /// Response body; empty unless a 2xx body was read in full.
    pub body_text: String,
}

impl RawReply {
    /// Reply standing in for a failed call.
    fn degraded(status_code: Option<u16>) -> Self {
        Self {
            status_code,
            body_text: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code.is_some_and(|code| (200..300).contains(&code))
    }
}

// ---------------------------------------------------------------------------
// GradingRelay
// ---------------------------------------------------------------------------

/// Forwards submissions to the grading webhook.
#[derive(Debug, Clone)]
pub struct GradingRelay {
    client: reqwest::Client,
    config: RelayConfig,
}

impl GradingRelay {
    /// Create a relay with a client bounded by the config timeout.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RelayError::Client)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Send `payload` once and capture the reply.
    ///
    /// Never fails: on any transport problem the returned reply has an
    /// empty body (and no status if nothing came back).
    pub async fn relay(&self, payload: &serde_json::Value) -> RawReply {
        match self.try_send(payload).await {
            Ok(reply) => {
                tracing::debug!(
                    url = %self.config.url,
                    status = ?reply.status_code,
                    bytes = reply.body_text.len(),
                    "Grading webhook replied"
                );
                reply
            }
            Err(e) => {
                tracing::warn!(url = %self.config.url, error = %e, "Grading webhook call failed");
                let status_code = match e {
                    RelayError::HttpStatus(code) | RelayError::Body { status: code, .. } => {
                        Some(code)
                    }
                    _ => None,
                };
                RawReply::degraded(status_code)
            }
        }
    }

    /// Execute a single POST and read the body as text.
    async fn try_send(&self, payload: &serde_json::Value) -> Result<RawReply, RelayError> {
        let response = self
            .client
            .post(self.config.url.clone())
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::HttpStatus(status.as_u16()));
        }

        let body_text = response
            .text()
            .await
            .map_err(|source| RelayError::Body {
                status: status.as_u16(),
                source,
            })?;
        Ok(RawReply {
            status_code: Some(status.as_u16()),
            body_text,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
