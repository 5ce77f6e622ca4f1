use thiserror::Error;

/// Errors returned by the cold-email platform client.
#[derive(Debug, Error)]
pub enum CampaignsError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-2xx status.
    #[error("campaign platform returned {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
