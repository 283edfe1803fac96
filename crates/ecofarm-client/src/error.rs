use thiserror::Error;

/// Errors returned by [`crate::PriceClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the `X-API-Key` header (HTTP 403).
    #[error("API key rejected by {url}")]
    InvalidApiKey { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    /// A scrape target failed local validation; no request was sent.
    #[error("invalid scrape target: {0}")]
    InvalidTarget(String),
}

impl ClientError {
    /// Returns `true` when the failure means the API key must be re-entered.
    #[must_use]
    pub fn is_invalid_api_key(&self) -> bool {
        matches!(self, ClientError::InvalidApiKey { .. })
    }
}
