//! HTTP answering service: posts chat requests to the backend proxy.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::answering::{AnsweringService, AskRequest, AskResponse};
use crate::error::TransportError;

/// Path of the backend's chat endpoint.
pub const CHAT_PATH: &str = "/api/chat";

/// Talks to the backend that proxies to the language-model provider.
///
/// Error bodies in the `{success: false, error}` shape are passed through as
/// [`AskResponse::Failure`] whatever the HTTP status; anything else that is
/// not a well-formed answer is a [`TransportError`].
pub struct HttpAnswering {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpAnswering {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), CHAT_PATH),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnsweringService for HttpAnswering {
    async fn ask(&self, request: AskRequest) -> Result<AskResponse, TransportError> {
        debug!(
            endpoint = %self.endpoint,
            history = request.history.len(),
            "Sending chat request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout)
                } else {
                    TransportError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        match AskResponse::from_json(&body) {
            Ok(parsed) => {
                if !status.is_success() {
                    debug!(
                        status = status.as_u16(),
                        "Backend returned error status with failure body"
                    );
                }
                Ok(parsed)
            }
            Err(e) if !status.is_success() => {
                warn!(status = status.as_u16(), error = %e, "Backend returned unparseable error");
                Err(TransportError::Request(format!("HTTP {status}")))
            }
            Err(e) => Err(e),
        }
    }
}
