use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;

use crate::error::WebhookError;
use crate::payload::WebhookPayload;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Posts JSON bodies to the workflow engine's webhook.
///
/// A client without a URL is valid: every dispatch then fails with
/// [`WebhookError::NotConfigured`], so callers see the missing setting at
/// the moment it matters.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: Client,
    url: Option<Url>,
    timeout_secs: u64,
}

impl WebhookClient {
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidUrl`] if `url` is given but does not
    /// parse, or [`WebhookError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(url: Option<&str>, timeout_secs: u64) -> Result<Self, WebhookError> {
        let url = url
            .map(|raw| Url::parse(raw).map_err(|e| WebhookError::InvalidUrl(e.to_string())))
            .transpose()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent("leadflow/0.1 (pipeline-dispatch)")
            .build()?;

        Ok(Self {
            client,
            url,
            timeout_secs,
        })
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Posts `body` and returns the engine's response text.
    ///
    /// # Errors
    ///
    /// - [`WebhookError::NotConfigured`] without a URL.
    /// - [`WebhookError::Timeout`] if no response arrives in time.
    /// - [`WebhookError::UpstreamStatus`] on a non-2xx response.
    /// - [`WebhookError::Http`] on any other transport failure.
    pub async fn dispatch<T: Serialize + ?Sized>(&self, body: &T) -> Result<String, WebhookError> {
        let url = self.url.as_ref().ok_or(WebhookError::NotConfigured)?;

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "workflow engine rejected webhook");
            return Err(WebhookError::UpstreamStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }

    fn transport_error(&self, error: reqwest::Error) -> WebhookError {
        if error.is_timeout() {
            WebhookError::Timeout(self.timeout_secs)
        } else {
            WebhookError::Http(error)
        }
    }
}

/// Where a launched pipeline is sent.
pub trait WebhookSink: Send + Sync {
    fn send_pipeline(
        &self,
        payload: &WebhookPayload,
    ) -> impl Future<Output = Result<String, WebhookError>> + Send;
}

impl WebhookSink for WebhookClient {
    async fn send_pipeline(&self, payload: &WebhookPayload) -> Result<String, WebhookError> {
        tracing::info!(pipeline_id = %payload.id, nom = %payload.nom, "dispatching pipeline webhook");
        self.dispatch(payload).await
    }
}
