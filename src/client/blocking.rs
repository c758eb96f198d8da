//! Blocking PadLM API client
//!
//! Same request/response/stream semantics as the async [`super::Client`];
//! only the I/O style differs. The streaming call returns an iterator that
//! decodes events line by line from the open response.

use std::io::{BufRead, BufReader, Lines};

use crate::error::{Error, Result};
use crate::types::{Message, StreamEvent};

use super::{decode_frame, Config, GenerateRequest, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};

/// Blocking PadLM API client
pub struct Client {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl Client {
    /// Build a client from a config
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
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
    pub fn create(&self, mut request: GenerateRequest) -> Result<Message> {
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
        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            tracing::warn!(%status, "Generate request failed");
            return Err(Error::Api { status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Open a streaming generate request and decode events as they arrive
    ///
    /// Dropping the returned iterator drops the HTTP response and closes the
    /// connection, whether the stream was exhausted or abandoned early.
    pub fn stream(&self, mut request: GenerateRequest) -> Result<EventIter> {
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
        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "failed to read error body".to_string());
            tracing::warn!(%status, "Streaming request failed");
            return Err(Error::Api { status, body });
        }

        Ok(EventIter {
            lines: BufReader::new(response).lines(),
            pending: Vec::new().into_iter(),
            done: false,
        })
    }
}

/// Lazy, finite, non-restartable sequence of decoded stream events
///
/// Ends when the backend closes the stream or emits `message_stop`. A decode
/// or read failure is yielded once and terminates the sequence; events
/// already yielded stay delivered.
pub struct EventIter {
    lines: Lines<BufReader<reqwest::blocking::Response>>,
    pending: std::vec::IntoIter<Result<StreamEvent>>,
    done: bool,
}

impl Iterator for EventIter {
    type Item = Result<StreamEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(item) = self.pending.next() {
                match &item {
                    Ok(event) if event.is_terminal() => self.done = true,
                    Err(_) => self.done = true,
                    Ok(_) => {}
                }
                return Some(item);
            }
            match self.lines.next() {
                Some(Ok(line)) => {
                    self.pending = decode_frame(&line).into_iter();
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
