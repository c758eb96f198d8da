//! Blocking chat adapter
//!
//! Mirror of [`super::PadLmChat`] over the blocking client. Normalization,
//! parameter merging, and result shaping are the shared code paths; only the
//! call style differs.

use std::time::Duration;

use serde_json::Map;

use crate::client::blocking::{Client, EventIter};
use crate::client::Config;
use crate::error::Result;
use crate::message::ChatMessage;

use super::{shape_result, ChatResult, ExtraParams, GenerationOptions, ResultContent};

/// Blocking chat adapter for the PadLM backend
pub struct PadLmChat {
    client: Client,
    options: GenerationOptions,
}

impl PadLmChat {
    /// Create an adapter from a connection config
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: Client::new(config)?,
            options: GenerationOptions::default(),
        })
    }

    /// Create an adapter from `PADLM_API_KEY` and `PADLM_API_URL`
    pub fn from_env() -> Result<Self> {
        tracing::info!("Creating blocking PadLM chat adapter from environment");
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

    /// Get the current model name
    pub fn model(&self) -> String {
        self.options.model.clone()
    }

    /// Generate a single result for the conversation
    pub fn generate(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
    ) -> Result<ChatResult> {
        self.generate_with(messages, stop, &Map::new())
    }

    /// Generate with per-call parameter overrides
    pub fn generate_with(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
        overrides: &ExtraParams,
    ) -> Result<ChatResult> {
        let request = self.options.build_request(messages, stop, overrides)?;

        if self.options.streaming {
            let mut text = String::new();
            for event in self.client.stream(request)? {
                if let Some(fragment) = event?.text_fragment() {
                    text.push_str(fragment);
                }
            }
            return Ok(ChatResult {
                content: ResultContent::Text(text),
                metadata: Map::new(),
            });
        }

        let message = self.client.create(request)?;
        shape_result(message)
    }

    /// Stream incremental text fragments for the conversation
    pub fn stream_text(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
    ) -> Result<TextFragments> {
        self.stream_with(messages, stop, &Map::new())
    }

    /// Stream text fragments with per-call parameter overrides
    pub fn stream_with(
        &self,
        messages: &[ChatMessage],
        stop: Option<Vec<String>>,
        overrides: &ExtraParams,
    ) -> Result<TextFragments> {
        let request = self.options.build_request(messages, stop, overrides)?;
        Ok(TextFragments {
            events: self.client.stream(request)?,
        })
    }
}

/// Iterator of text fragments drawn from a decoded event stream
///
/// Events that carry no text (pings, block lifecycle, message metadata) are
/// consumed without producing a fragment.
pub struct TextFragments {
    events: EventIter,
}

impl Iterator for TextFragments {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        for event in self.events.by_ref() {
            match event {
                Ok(event) => {
                    if let Some(fragment) = event.text_fragment() {
                        return Some(Ok(fragment.to_string()));
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }
}
