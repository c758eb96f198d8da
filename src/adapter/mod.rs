//! Chat adapter
//!
//! The integration point a chat-oriented framework talks to: generic
//! messages in, a generated result or text-fragment stream out. The adapter
//! owns its client (built once at construction), runs the normalizer, merges
//! generation parameters, and shapes backend responses into the
//! backend-agnostic [`ChatResult`].

pub mod blocking;

use std::pin::Pin;
use std::time::Duration;

use futures::stream::Stream;
use futures::{StreamExt, TryStreamExt};
use serde_json::{Map, Value};

use crate::client::{Client, Config, GenerateRequest};
use crate::error::Result;
use crate::message::ChatMessage;
use crate::normalize::normalize;
use crate::types::{ContentBlock, Message};

/// Free-form model parameters merged into the request body
pub type ExtraParams = Map<String, Value>;

/// A boxed stream of generated text fragments
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// ============================================================================
// Result shaping
// ============================================================================

/// Content of a generated result
///
/// A response with exactly one text block collapses to the plain string;
/// anything else passes the block sequence through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Backend-agnostic generation result
#[derive(Debug, Clone)]
pub struct ChatResult {
    /// The generated content
    pub content: ResultContent,

    /// Auxiliary response fields (id, model, stop_reason, usage)
    pub metadata: Map<String, Value>,
}

/// Translate a backend message into the framework result shape
fn shape_result(message: Message) -> Result<ChatResult> {
    let mut metadata = match serde_json::to_value(&message)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    metadata.remove("content");
    metadata.remove("role");
    metadata.remove("type");

    let single_text = match &message.content[..] {
        [block] => block.as_text().map(str::to_string),
        _ => None,
    };
    let content = match single_text {
        Some(text) => ResultContent::Text(text),
        None => ResultContent::Blocks(message.content),
    };

    Ok(ChatResult { content, metadata })
}

// ============================================================================
// Generation options
// ============================================================================

/// Generation knobs shared by the async and blocking adapters
#[derive(Debug, Clone)]
pub(crate) struct GenerationOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub streaming: bool,
    pub extra_params: ExtraParams,
    pub timeout: Option<Duration>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 1024,
            temperature: None,
            top_k: None,
            top_p: None,
            streaming: false,
            extra_params: Map::new(),
            timeout: None,
        }
    }
}

impl GenerationOptions {
    /// Normalize messages and merge parameters into one request body
    ///
    /// Precedence: per-call overrides, then adapter-level extras, then
    /// built-ins. A null value unsets the parameter so it is omitted from
    /// the wire instead of sent as `null`.
    pub(crate) fn build_request(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
        overrides: &ExtraParams,
    ) -> Result<GenerateRequest> {
        let (system, turns) = normalize(messages)?;

        let mut request = GenerateRequest::new(self.max_tokens, turns, self.model.clone());
        request.stop_sequences = stop;
        request.system = system;
        request.temperature = self.temperature;
        request.top_k = self.top_k;
        request.top_p = self.top_p;
        request.timeout = self.timeout;

        let mut extra = self.extra_params.clone();
        for (key, value) in overrides {
            extra.insert(key.clone(), value.clone());
        }
        apply_extras(&mut request, extra)?;

        Ok(request)
    }
}

/// Merge resolved extras into the request
///
/// Known knobs route into their typed fields so an override replaces the
/// built-in value instead of duplicating the key on the wire. A null value
/// unsets the knob it names, so the body omits it rather than carrying JSON
/// `null`. `stream` and `messages` are owned by the call itself and are
/// never taken from extras.
fn apply_extras(request: &mut GenerateRequest, extra: ExtraParams) -> Result<()> {
    for (key, value) in extra {
        if value.is_null() {
            unset_param(request, &key);
            continue;
        }
        match key.as_str() {
            "max_tokens" => request.max_tokens = serde_json::from_value(value)?,
            "model" => request.model = serde_json::from_value(value)?,
            "stop_sequences" => request.stop_sequences = Some(serde_json::from_value(value)?),
            "system" => request.system = Some(serde_json::from_value(value)?),
            "temperature" => request.temperature = Some(serde_json::from_value(value)?),
            "top_k" => request.top_k = Some(serde_json::from_value(value)?),
            "top_p" => request.top_p = Some(serde_json::from_value(value)?),
            "stream" | "messages" => {
                tracing::warn!(key = %key, "Ignoring reserved request field in extra parameters");
            }
            _ => {
                request.extra.insert(key, value);
            }
        }
    }
    Ok(())
}

/// Clear the typed field a null extra names
///
/// `max_tokens` and `model` are always sent, so a null for them is a no-op;
/// a null for an unrouted key simply never reaches the flattened map.
fn unset_param(request: &mut GenerateRequest, key: &str) {
    match key {
        "stop_sequences" => request.stop_sequences = None,
        "system" => request.system = None,
        "temperature" => request.temperature = None,
        "top_k" => request.top_k = None,
        "top_p" => request.top_p = None,
        _ => {}
    }
}

// ============================================================================
// ChatModel trait
// ============================================================================

/// Trait for chat models pluggable into the surrounding framework
///
/// Abstracts the generate-once and generate-streaming operations so callers
/// never see the backend wire format.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a single result for the conversation
    async fn generate(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
    ) -> Result<ChatResult>;

    /// Stream incremental text fragments for the conversation
    async fn stream_text(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
    ) -> Result<TextStream>;

    /// Get the current model name
    fn model(&self) -> String;
}

// ============================================================================
// PadLmChat
// ============================================================================

/// Asynchronous chat adapter for the PadLM backend
pub struct PadLmChat {
    client: Client,
    options: GenerationOptions,
}

impl PadLmChat {
    /// Create an adapter from a connection config
    ///
    /// The client is built here, once; missing credentials fail now rather
    /// than on the first call.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: Client::new(config)?,
            options: GenerationOptions::default(),
        })
    }

    /// Create an adapter from `PADLM_API_KEY` and `PADLM_API_URL`
    pub fn from_env() -> Result<Self> {
        tracing::info!("Creating PadLM chat adapter from environment");
        Self::new(&Config::from_env()?)
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.options.model = model.into();
        self
    }

    /// Set the max tokens per generation (default 1024)
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    /// Set the top-k sampling cutoff
    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.options.top_k = Some(top_k);
        self
    }

    /// Set the nucleus sampling mass
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.options.top_p = Some(top_p);
        self
    }

    /// Route generate-once calls through the streaming path
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.options.streaming = streaming;
        self
    }

    /// Set a per-call request timeout (the client default is 600 s)
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Set adapter-level pass-through model parameters
    pub fn with_extra_params(mut self, extra_params: ExtraParams) -> Self {
        self.options.extra_params = extra_params;
        self
    }

    /// Generate with per-call parameter overrides
    pub async fn generate_with(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
        overrides: &ExtraParams,
    ) -> Result<ChatResult> {
        let request = self.options.build_request(messages, stop, overrides)?;

        if self.options.streaming {
            let mut events = self.client.stream(request).await?;
            let mut text = String::new();
            while let Some(event) = events.next().await {
                if let Some(fragment) = event?.text_fragment() {
                    text.push_str(fragment);
                }
            }
            return Ok(ChatResult {
                content: ResultContent::Text(text),
                metadata: Map::new(),
            });
        }

        let message = self.client.create(request).await?;
        shape_result(message)
    }

    /// Stream text fragments with per-call parameter overrides
    pub async fn stream_with(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
        overrides: &ExtraParams,
    ) -> Result<TextStream> {
        let request = self.options.build_request(messages, stop, overrides)?;
        let events = self.client.stream(request).await?;
        Ok(Box::pin(events.try_filter_map(|event| async move {
            Ok(event.text_fragment().map(str::to_string))
        })))
    }
}

#[async_trait::async_trait]
impl ChatModel for PadLmChat {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
    ) -> Result<ChatResult> {
        self.generate_with(messages, stop, &Map::new()).await
    }

    async fn stream_text(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
    ) -> Result<TextStream> {
        self.stream_with(messages, stop, &Map::new()).await
    }

    fn model(&self) -> String {
        self.options.model.clone()
    }
}
