use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::transport::Transport;
use crate::error::{Result, SyncError};

/// Server-to-server OAuth credentials for a Zoom account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// `Authorization` header value for the token exchange.
    pub fn basic_authorization(&self) -> String {
        let pair = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", BASE64.encode(pair.as_bytes()))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Exchanges account credentials for a short-lived bearer token.
pub struct TokenProvider<'a> {
    transport: &'a dyn Transport,
    token_url: String,
}

impl<'a> TokenProvider<'a> {
    pub fn new(transport: &'a dyn Transport, token_url: impl Into<String>) -> Self {
        Self {
            transport,
            token_url: token_url.into(),
        }
    }

    /// Perform the `account_credentials` grant. Never retried.
    pub async fn fetch(&self, credentials: &Credentials) -> Result<String> {
        let form = vec![
            ("grant_type".to_string(), "account_credentials".to_string()),
            ("account_id".to_string(), credentials.account_id.clone()),
        ];

        debug!("Requesting access token from {}", self.token_url);

        let reply = self
            .transport
            .post_form(&self.token_url, &credentials.basic_authorization(), &form)
            .await
            .map_err(|err| SyncError::Authentication(err.to_string()))?;

        if !reply.is_ok() {
            error!(
                "Token exchange failed with status {}: {}",
                reply.status,
                reply.text()
            );
            return Err(SyncError::Authentication(format!(
                "token endpoint returned HTTP {}. Check your account credentials",
                reply.status
            )));
        }

        let response: TokenResponse = serde_json::from_slice(&reply.body).map_err(|err| {
            SyncError::Authentication(format!("unreadable token response: {err}"))
        })?;

        let token = response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                SyncError::Authentication("token response has no access_token".to_string())
            })?;

        info!("Obtained access token");
        Ok(token)
    }
}
