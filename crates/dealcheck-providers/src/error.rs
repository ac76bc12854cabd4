use thiserror::Error;

/// Errors raised inside a provider adapter.
///
/// These never cross the adapter boundary: the public adapter operations
/// catch them, log a structured warning, and return the empty/absent result
/// for that call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network or TLS failure, or a non-2xx HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token exchange was rejected or returned an unusable payload.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A base URL override could not be parsed.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
