// HTTP fetches for content sources

use crate::config::ContentConfig;
use crate::tag::Mac;
use anyhow::{Context, Result};
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
mod tests;

/// Why a fetch produced no content
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Server answered with an unexpected status
    Status(u16),
    /// Connection, timeout or body read failure
    Transport(String),
    /// Body was not what the caller expected
    Parse(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status(code) => write!(f, "http status {}", code),
            FetchError::Transport(e) => write!(f, "http transport error: {}", e),
            FetchError::Parse(e) => write!(f, "invalid response body: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

/// Outcome of a conditional GET
#[derive(Debug, Clone, PartialEq)]
pub enum Conditional {
    Fetched(Vec<u8>),
    NotModified,
}

/// Shared HTTP client with the controller's timeouts
pub struct Fetcher {
    client: Client,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tagflux/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, timeout })
    }

    pub fn from_config(config: &ContentConfig) -> Result<Self> {
        Self::new(Duration::from_secs(config.http_timeout_seconds))
    }

    /// GET with `If-Modified-Since` set from `since` (unix seconds) and the
    /// requesting tag's MAC in `X-ESL-MAC`.
    pub async fn get_conditional(
        &self,
        url: &str,
        since: i64,
        mac: &Mac,
    ) -> Result<Conditional, FetchError> {
        let response = self
            .client
            .get(url)
            .header("If-Modified-Since", http_date(since))
            .header("X-ESL-MAC", mac.to_hex())
            .timeout(self.timeout)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Conditional::Fetched(response.bytes().await?.to_vec())),
            StatusCode::NOT_MODIFIED => {
                debug!(url, "Not modified");
                Ok(Conditional::NotModified)
            }
            other => Err(FetchError::Status(other.as_u16())),
        }
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.get_bytes_within(url, self.timeout).await
    }

    pub async fn get_bytes_within(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.get_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.get_json_within(url, self.timeout).await
    }

    pub async fn get_json_within(&self, url: &str, timeout: Duration) -> Result<Value, FetchError> {
        let bytes = self.get_bytes_within(url, timeout).await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

/// RFC 7231 date for unix seconds
pub fn http_date(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .unwrap_or_default()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
