//! Client SDK for the PadLM generate API
//!
//! Exposes a backend-agnostic chat interface over the backend's own wire
//! format: a list of role-tagged [`ChatMessage`]s in, a generated
//! [`ChatResult`] or stream of text fragments out.
//!
//! Layered leaf-first:
//! - [`types`]: wire-level response and stream-event model
//! - [`normalize`]: generic messages to backend-shaped turns
//! - [`client`]: HTTP transport, request building, stream decoding
//! - [`adapter`]: the framework-facing chat surface
//!
//! ```ignore
//! use padlm_sdk::{ChatMessage, ChatModel, PadLmChat};
//!
//! let chat = PadLmChat::from_env()?.with_model("padlm-7b");
//! let result = chat.generate(&[ChatMessage::human("Hello")], None).await?;
//! ```

pub mod adapter;
pub mod client;
pub mod error;
pub mod message;
pub mod normalize;
pub mod types;

pub use adapter::{ChatModel, ChatResult, ExtraParams, PadLmChat, ResultContent, TextStream};
pub use client::{Client, Config, GenerateRequest};
pub use error::{Error, Result};
pub use message::{ChatContent, ChatMessage};
pub use normalize::{normalize, Role, Turn, TurnContent};
pub use types::{ContentBlock, ContentDelta, Envelope, Message, StreamEvent, Usage};
