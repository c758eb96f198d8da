//! SDK error types

use thiserror::Error;

/// Errors that can occur in the PadLM client SDK
#[derive(Error, Debug)]
pub enum Error {
    /// API key missing at construction time
    #[error("PadLM API key not set: pass one explicitly or set PADLM_API_KEY")]
    MissingApiKey,

    /// API base URL missing at construction time
    #[error("PadLM API URL not set: pass one explicitly or set PADLM_API_URL")]
    MissingBaseUrl,

    /// Invalid header name or value in custom default headers
    #[error("Invalid default header: {0}")]
    InvalidHeader(String),

    /// System message found anywhere but the first position
    #[error("System message must be at beginning of message list")]
    SystemNotFirst,

    /// System message content was not plain text
    #[error("System message content must be plain text")]
    SystemNotText,

    /// Structured content item without a `type` discriminator
    #[error("Content item must have a \"type\" key: {0}")]
    UntypedContentItem(String),

    /// Content item that is neither a string nor a typed object
    #[error("Content items must be strings or typed objects, instead was: {0}")]
    UnsupportedContentItem(String),

    /// HTTP transport failure (connect, timeout, body read)
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the backend
    #[error("PadLM API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Malformed JSON in a response body or stream frame
    #[error("Malformed JSON from backend: {0}")]
    Json(#[from] serde_json::Error),

    /// Stream I/O failure while reading frames
    #[error("Stream read error: {0}")]
    StreamIo(#[from] std::io::Error),

    /// Stream event with a `type` outside the known protocol
    #[error("Unrecognized stream event type: {0:?}")]
    UnknownEvent(String),

    /// Undecodable bytes left at the end of a stream frame
    #[error("Undecodable trailing data in stream frame: {0:?}")]
    TrailingData(String),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::SystemNotFirst;
        assert_eq!(
            err.to_string(),
            "System message must be at beginning of message list"
        );

        let err = Error::UnknownEvent("content_block_explode".into());
        assert!(err.to_string().contains("content_block_explode"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
