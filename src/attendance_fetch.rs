use std::time::Duration;

use reqwest::header::CACHE_CONTROL;
use serde_json::Value;
use thiserror::Error;

use crate::http_client::http_client;

/// Body excerpt length kept on a non-success response.
const EXCERPT_CHARS: usize = 200;

/// Undecoded backend payload; shape is reconciled by the normalizer.
pub type RawPayload = Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {excerpt}")]
    Protocol { status: u16, excerpt: String },
    #[error("schema error: {0}")]
    Schema(String),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// One attempt per call; never retries.
pub trait AttendanceSource: Send + Sync {
    fn fetch(&self) -> Result<RawPayload, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpAttendanceSource {
    url: String,
    timeout: Duration,
}

impl HttpAttendanceSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl AttendanceSource for HttpAttendanceSource {
    fn fetch(&self) -> Result<RawPayload, FetchError> {
        fetch_attendance(&self.url, self.timeout)
    }
}

pub fn fetch_attendance(url: &str, timeout: Duration) -> Result<RawPayload, FetchError> {
    let client = http_client().map_err(|err| FetchError::Network(format!("{err:#}")))?;

    let resp = client
        .get(url)
        .header(CACHE_CONTROL, "no-store")
        .timeout(timeout)
        .send()
        .map_err(|err| network_error(err, timeout))?;
    let status = resp.status();
    let body = resp.text().map_err(|err| network_error(err, timeout))?;
    if !status.is_success() {
        return Err(FetchError::Protocol {
            status: status.as_u16(),
            excerpt: body_excerpt(&body),
        });
    }
    tracing::debug!(url, bytes = body.len(), "attendance payload received");
    parse_payload_json(&body)
}

pub fn parse_payload_json(raw: &str) -> Result<RawPayload, FetchError> {
    serde_json::from_str(raw.trim())
        .map_err(|err| FetchError::Schema(format!("invalid attendance json: {err}")))
}

fn network_error(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Network(format!("request timed out after {}s", timeout.as_secs()))
    } else {
        FetchError::Network(err.to_string())
    }
}

fn body_excerpt(body: &str) -> String {
    body.trim().chars().take(EXCERPT_CHARS).collect()
}
