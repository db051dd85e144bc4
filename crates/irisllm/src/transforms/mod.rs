//! Streaming translation into the Anthropic Messages vocabulary.
//!
//! Each translator is a pull-driven iterator over
//! `Result<MessagesStreamEvent, StreamError>`: the consumer demands the next
//! event and the translator reads upstream frames synchronously to satisfy
//! it. State lives in the translator instance; nothing is shared between
//! streams.

pub mod block_sequencer;
pub mod chat_completions_stream;
pub mod message_builder;
pub mod responses_stream;

use std::io;
use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::apis::sse::SseFramerError;
use crate::providers::error::ProviderError;

#[derive(Debug, Error)]
pub enum StreamError {
    /// Upstream read or network failure, surfaced as-is.
    #[error("upstream transport error: {0}")]
    Transport(#[from] io::Error),

    /// Malformed SSE framing or JSON syntax. Fatal.
    #[error("malformed event stream: {0}")]
    Protocol(String),

    /// An unknown discriminator or shape mismatch in a tagged union. Fatal.
    #[error("failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        source: serde_json::Error,
    },

    /// A structured error from the upstream provider.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A condition the upstream contract forbids on this path.
    #[error("translation contract violated: {0}")]
    Contract(String),
}

impl StreamError {
    pub(crate) fn decode(context: &'static str, source: serde_json::Error) -> Self {
        StreamError::Decode { context, source }
    }
}

impl From<SseFramerError> for StreamError {
    fn from(err: SseFramerError) -> Self {
        match err {
            SseFramerError::Io(err) => StreamError::Transport(err),
            SseFramerError::Protocol(message) => StreamError::Protocol(message),
        }
    }
}

/// Per-stream conversion options, supplied by the caller at construction.
/// The translator never reads global state at emission time.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    /// Seeds `message_start` usage; chat upstreams do not echo the prompt
    /// size until the final chunk.
    pub input_tokens: u32,

    /// Multiplier applied to input, output and cached token counts before
    /// emission (floored). Compensates for context-window scaling between
    /// providers.
    pub resize_factor: f64,

    /// Separator between a reasoning id and its encrypted data when the two
    /// are folded into one signature.
    pub reasoning_delimiter: String,

    /// Set-once sink that receives the upstream provider identifier, when
    /// the upstream is an aggregator that reports one.
    pub provider_sink: Option<Arc<OnceLock<String>>>,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            input_tokens: 0,
            resize_factor: 1.0,
            reasoning_delimiter: std::path::MAIN_SEPARATOR.to_string(),
            provider_sink: None,
        }
    }
}

pub(crate) fn scale_tokens(count: u32, factor: f64) -> u32 {
    (count as f64 * factor).floor() as u32
}
