use thiserror::Error;

/// Errors returned when forwarding a pipeline to the workflow engine.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook URL is not configured")]
    NotConfigured,

    #[error("invalid webhook URL: {0}")]
    InvalidUrl(String),

    #[error("webhook timed out after {0}s")]
    Timeout(u64),

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The workflow engine answered with a non-2xx status.
    #[error("workflow engine returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
}
