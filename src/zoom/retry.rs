use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::transport::{HttpReply, Transport, TransportError};

/// Bounded exponential backoff for transient HTTP failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Issue a GET, retrying 5xx/429 replies and timeouts/connection failures.
    ///
    /// Any other reply (including 4xx) is returned to the caller as-is.
    pub async fn get(
        &self,
        transport: &dyn Transport,
        url: &str,
        authorization: &str,
        query: &[(String, String)],
    ) -> Result<HttpReply, TransportError> {
        self.attempt("GET", url, move || transport.get(url, authorization, query))
            .await
    }

    /// Fetch a recording body with the same retry rules as [`RetryPolicy::get`].
    pub async fn download(
        &self,
        transport: &dyn Transport,
        url: &str,
        authorization: &str,
    ) -> Result<HttpReply, TransportError> {
        self.attempt("Download", url, move || transport.download(url, authorization))
            .await
    }

    async fn attempt<F, Fut>(
        &self,
        label: &str,
        url: &str,
        mut call: F,
    ) -> Result<HttpReply, TransportError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<HttpReply, TransportError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = call().await;
            let retryable = match &outcome {
                Ok(reply) => reply.is_transient(),
                Err(err) => err.is_transient(),
            };

            if !retryable || attempt >= max_attempts {
                return outcome;
            }

            let delay = self.delay_for(attempt);
            match &outcome {
                Ok(reply) => warn!(
                    "{} {} returned {} (attempt {}/{}), retrying in {:?}",
                    label, url, reply.status, attempt, max_attempts, delay
                ),
                Err(err) => warn!(
                    "{} {} failed: {} (attempt {}/{}), retrying in {:?}",
                    label, url, err, attempt, max_attempts, delay
                ),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
