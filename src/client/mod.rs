//! PadLM generate API client
//!
//! Owns the HTTP transport and the streaming-protocol decode. Two call
//! styles with identical semantics: [`Client`] (async) and
//! [`blocking::Client`], split only at the I/O boundary.

pub mod blocking;
mod decode;

use std::collections::HashMap;
use std::env;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::Stream;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

use crate::error::{Error, Result};
use crate::normalize::Turn;
use crate::types::{Message, StreamEvent};

pub(crate) use decode::decode_frame;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "PADLM_API_KEY";

/// Environment variable holding the API base URL
pub const API_URL_ENV: &str = "PADLM_API_URL";

/// Path of the generate endpoint, relative to the base URL
const GENERATE_PATH: &str = "/api/v1/generate";

/// Default total request timeout (10 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Configuration
// ============================================================================

/// Connection configuration for a client
///
/// Both the API key and base URL are required; a missing value is a
/// construction-time error, never a call-time one.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key sent in the `X-API-Key` header
    pub api_key: String,

    /// Base URL of the backend (the generate path is appended)
    pub base_url: String,

    /// Extra headers sent with every request
    pub default_headers: HashMap<String, String>,

    /// Total request timeout (defaults to 600 s)
    pub timeout: Option<Duration>,
}

impl Config {
    /// Create a config from explicit credentials
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_headers: HashMap::new(),
            timeout: None,
        }
    }

    /// Resolve a config from `PADLM_API_KEY` and `PADLM_API_URL`
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            env::var(API_KEY_ENV)
                .ok()
                .filter(|s| !s.is_empty())
                .ok_or(Error::MissingApiKey)?,
            env::var(API_URL_ENV)
                .ok()
                .filter(|s| !s.is_empty())
                .ok_or(Error::MissingBaseUrl)?,
        ))
    }

    /// Add extra headers sent with every request
    pub fn with_default_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.default_headers = headers;
        self
    }

    /// Override the total request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the default header map: content type, API key, then customs
    pub(crate) fn header_map(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-API-Key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| Error::InvalidHeader("X-API-Key".to_string()))?,
        );
        for (name, value) in &self.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::InvalidHeader(name.to_string()))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), GENERATE_PATH)
    }
}

// ============================================================================
// Request body
// ============================================================================

/// Request body for the generate endpoint
///
/// Optional generation knobs are omitted from the wire when unset. Free-form
/// extra parameters are flattened into the top-level object.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Normalized turns
    pub messages: Vec<Turn>,

    /// The model to use
    pub model: String,

    /// Sequences that stop generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    /// Whether the response is streamed (set by the client per call style)
    pub stream: bool,

    /// System prompt captured by the normalizer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-k sampling cutoff
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Nucleus sampling mass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Backend-specific pass-through parameters
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Per-call timeout override (client default applies when unset)
    #[serde(skip_serializing)]
    pub timeout: Option<Duration>,
}

impl GenerateRequest {
    /// Create a request with the required fields; knobs default to unset
    pub fn new(max_tokens: u32, messages: Vec<Turn>, model: impl Into<String>) -> Self {
        Self {
            max_tokens,
            messages,
            model: model.into(),
            stop_sequences: None,
            stream: false,
            system: None,
            temperature: None,
            top_k: None,
            top_p: None,
            extra: Map::new(),
            timeout: None,
        }
    }
}

// ============================================================================
// Async client
// ============================================================================

/// A boxed stream of decoded events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Asynchronous PadLM API client
pub struct Client {
    http: reqwest::Client,
    endpoint: String,
}

impl Client {
    /// Build a client from a config
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .default_headers(config.header_map()?)
            .timeout(config.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint(),
        })
    }

    /// Send a single-shot generate request and parse the full response
    pub async fn create(&self, mut request: GenerateRequest) -> Result<Message> {
        request.stream = false;
        tracing::debug!(
            model = %request.model,
            turns = request.messages.len(),
            "Sending generate request"
        );

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(%status, "Generate request failed");
            return Err(Error::Api { status, body });
        }

        let message: Message = serde_json::from_str(&body)?;
        tracing::debug!(id = %message.id, blocks = message.content.len(), "Received response");
        Ok(message)
    }

    /// Open a streaming generate request and decode events as they arrive
    ///
    /// The stream is lazy and finite: it ends when the backend closes the
    /// connection or emits `message_stop`, and a decode failure terminates it
    /// after the events already yielded. Dropping the stream drops the HTTP
    /// response and closes the connection.
    pub async fn stream(&self, mut request: GenerateRequest) -> Result<EventStream> {
        request.stream = true;
        tracing::debug!(
            model = %request.model,
            turns = request.messages.len(),
            "Opening generate stream"
        );

        let mut builder = self.http.post(&self.endpoint).json(&request);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            tracing::warn!(%status, "Streaming request failed");
            return Err(Error::Api { status, body });
        }

        let byte_stream = response.bytes_stream();
        let reader = StreamReader::new(
            byte_stream.map(|result| result.map_err(std::io::Error::other)),
        );
        let buf_reader = tokio::io::BufReader::new(reader);

        let stream = async_stream::try_stream! {
            let mut lines = buf_reader.lines();
            let mut finished = false;

            while let Some(line) = lines.next_line().await? {
                for decoded in decode_frame(&line) {
                    let event = decoded?;
                    if event.is_terminal() {
                        finished = true;
                    }
                    yield event;
                    if finished {
                        break;
                    }
                }
                if finished {
                    break;
                }
            }
            tracing::debug!("Generate stream ended");
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{Role, TurnContent};

    fn turn(text: &str) -> Turn {
        Turn {
            role: Role::User,
            content: TurnContent::Text(text.to_string()),
        }
    }

    #[test]
    fn test_request_omits_unset_knobs() {
        let request = GenerateRequest::new(1024, vec![turn("hi")], "padlm-7b");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["stream"], false);
        assert!(json.get("temperature").is_none());
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_request_flattens_extra_params() {
        let mut request = GenerateRequest::new(16, vec![], "padlm-7b");
        request.extra.insert("seed".into(), serde_json::json!(7));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["seed"], 7);
    }

    #[test]
    fn test_config_endpoint_trims_trailing_slash() {
        let config = Config::new("key", "http://localhost:8080/");
        assert_eq!(config.endpoint(), "http://localhost:8080/api/v1/generate");
    }

    #[test]
    fn test_header_map_carries_api_key() {
        let config = Config::new("secret", "http://localhost");
        let headers = config.header_map().unwrap();
        assert_eq!(headers.get("X-API-Key").unwrap(), "secret");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_invalid_custom_header_is_error() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "v".to_string());
        let config = Config::new("key", "http://localhost").with_default_headers(headers);
        assert!(matches!(
            config.header_map().unwrap_err(),
            Error::InvalidHeader(_)
        ));
    }
}
