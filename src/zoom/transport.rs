//! HTTP transport abstraction.
//!
//! Components talk to the Zoom API through [`Transport`] so the listing and
//! download logic can be exercised against scripted responses in tests.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Server-side or throttling failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        self.status == 429 || (500..600).contains(&self.status)
    }

    /// Body as text, lossily decoded, for log and error messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failure to complete an HTTP exchange at all (no status received).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST an `application/x-www-form-urlencoded` body.
    async fn post_form(
        &self,
        url: &str,
        authorization: &str,
        form: &[(String, String)],
    ) -> Result<HttpReply, TransportError>;

    /// GET `url` with the given query parameters.
    async fn get(
        &self,
        url: &str,
        authorization: &str,
        query: &[(String, String)],
    ) -> Result<HttpReply, TransportError>;

    /// GET a recording body. Large bodies may take arbitrarily long as long as
    /// bytes keep arriving.
    async fn download(&self, url: &str, authorization: &str) -> Result<HttpReply, TransportError>;
}

/// Production transport backed by `reqwest`.
///
/// API calls are bounded by `request_timeout` end to end. Downloads have no
/// total deadline; they fail once the server stays silent for `idle_timeout`.
pub struct ReqwestTransport {
    client: Client,
    request_timeout: Duration,
    idle_timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration, idle_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .user_agent(concat!("zoomdl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            request_timeout,
            idle_timeout,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post_form(
        &self,
        url: &str,
        authorization: &str,
        form: &[(String, String)],
    ) -> Result<HttpReply, TransportError> {
        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .header("Authorization", authorization)
            .form(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!("POST {}: {}", url, status);
        Ok(HttpReply::new(status, body.to_vec()))
    }

    async fn get(
        &self,
        url: &str,
        authorization: &str,
        query: &[(String, String)],
    ) -> Result<HttpReply, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .header("Authorization", authorization)
            .header("Content-Type", "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.bytes().await?;
        debug!("{}:{}", final_url, status);
        Ok(HttpReply::new(status, body.to_vec()))
    }

    async fn download(&self, url: &str, authorization: &str) -> Result<HttpReply, TransportError> {
        let request = self
            .client
            .get(url)
            .header("Authorization", authorization)
            .send();
        let mut response = tokio::time::timeout(self.idle_timeout, request)
            .await
            .map_err(|_| TransportError::Timeout)??;

        let status = response.status().as_u16();
        let mut body = Vec::new();
        while let Some(chunk) = tokio::time::timeout(self.idle_timeout, response.chunk())
            .await
            .map_err(|_| TransportError::Timeout)??
        {
            body.extend_from_slice(&chunk);
        }

        debug!("download {}: {} ({} bytes)", url, status, body.len());
        Ok(HttpReply::new(status, body))
    }
}
