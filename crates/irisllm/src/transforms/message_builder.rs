use serde_json::Value;
use thiserror::Error;

use crate::apis::anthropic::{
    Message, MessagesContentBlock, MessagesContentDelta, MessagesRole, MessagesStreamEvent,
    MessagesUsage,
};

#[derive(Debug, Error)]
pub enum MessageBuildError {
    /// The stream carried an `error` event instead of content.
    #[error("upstream stream error ({error_type}): {message}")]
    Upstream { error_type: String, message: String },

    /// `redacted_thinking` cannot originate from translation; seeing one here
    /// is a programming error, not a recoverable condition.
    #[error("redacted_thinking blocks cannot reach the translation path")]
    RedactedThinking,

    /// The accumulated tool input was not valid JSON once complete.
    #[error("tool input is not valid JSON: {0}")]
    InvalidToolInput(#[from] serde_json::Error),

    /// A delta or stop referenced a content index that was never started.
    #[error("event addresses content index {0} that was never started")]
    UnknownIndex(usize),
}

/// Folds an Anthropic event stream back into one complete [`Message`].
///
/// Used by non-streaming callers and by tests. Text and thinking deltas
/// accumulate in a string scratch, tool input in a byte scratch; both are
/// owned by the builder and reset per block.
#[derive(Debug)]
pub struct MessageBuilder {
    message: Message,
    text_scratch: String,
    json_scratch: Vec<u8>,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self {
            message: Message {
                id: String::new(),
                obj_type: "message".to_string(),
                role: MessagesRole::Assistant,
                content: Vec::new(),
                model: String::new(),
                stop_reason: None,
                stop_sequence: None,
                usage: MessagesUsage::default(),
            },
            text_scratch: String::new(),
            json_scratch: Vec::new(),
        }
    }

    /// Apply one stream event. The first error is terminal for the stream;
    /// callers should stop feeding the builder after it.
    pub fn add(&mut self, event: &MessagesStreamEvent) -> Result<(), MessageBuildError> {
        match event {
            MessagesStreamEvent::Ping => {}

            MessagesStreamEvent::Error { error } => {
                return Err(MessageBuildError::Upstream {
                    error_type: error.error_type.clone(),
                    message: error.message.clone(),
                });
            }

            MessagesStreamEvent::MessageStart { message } => {
                self.message.id = message.id.clone();
                self.message.model = message.model.clone();
                self.message.usage.input_tokens = message.usage.input_tokens;
            }

            MessagesStreamEvent::MessageDelta { delta, usage } => {
                self.message.stop_reason = Some(delta.stop_reason.clone());
                if delta.stop_sequence.is_some() {
                    self.message.stop_sequence = delta.stop_sequence.clone();
                }
                if let Some(usage) = usage {
                    if usage.input_tokens > 0 {
                        self.message.usage.input_tokens = usage.input_tokens;
                    }
                    if usage.output_tokens > 0 {
                        self.message.usage.output_tokens = usage.output_tokens;
                    }
                    if usage.cache_creation_input_tokens.unwrap_or(0) > 0 {
                        self.message.usage.cache_creation_input_tokens =
                            usage.cache_creation_input_tokens;
                    }
                    if usage.cache_read_input_tokens.unwrap_or(0) > 0 {
                        self.message.usage.cache_read_input_tokens = usage.cache_read_input_tokens;
                    }
                }
            }

            MessagesStreamEvent::MessageStop => {}

            MessagesStreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                if matches!(content_block, MessagesContentBlock::RedactedThinking { .. }) {
                    return Err(MessageBuildError::RedactedThinking);
                }
                let index = *index as usize;
                while self.message.content.len() <= index {
                    self.message.content.push(MessagesContentBlock::empty_text());
                }
                self.message.content[index] = content_block.clone();
                self.text_scratch.clear();
                self.json_scratch.clear();
            }

            MessagesStreamEvent::ContentBlockDelta { index, delta } => {
                let index = *index as usize;
                let block = self
                    .message
                    .content
                    .get_mut(index)
                    .ok_or(MessageBuildError::UnknownIndex(index))?;

                match delta {
                    MessagesContentDelta::TextDelta { text } => {
                        self.text_scratch.push_str(text);
                    }
                    MessagesContentDelta::ThinkingDelta { thinking } => {
                        self.text_scratch.push_str(thinking);
                    }
                    MessagesContentDelta::InputJsonDelta { partial_json } => {
                        self.json_scratch.extend_from_slice(partial_json.as_bytes());
                    }
                    MessagesContentDelta::SignatureDelta { signature } => {
                        if let MessagesContentBlock::Thinking {
                            signature: block_signature,
                            ..
                        } = block
                        {
                            *block_signature = Some(signature.clone());
                        }
                    }
                    MessagesContentDelta::CitationsDelta { citation } => {
                        if let MessagesContentBlock::Text { citations, .. } = block {
                            citations.get_or_insert_with(Vec::new).push(citation.clone());
                        }
                    }
                }
            }

            MessagesStreamEvent::ContentBlockStop { index } => {
                let index = *index as usize;
                let block = self
                    .message
                    .content
                    .get_mut(index)
                    .ok_or(MessageBuildError::UnknownIndex(index))?;

                match block {
                    MessagesContentBlock::Text { text, .. } => {
                        *text = std::mem::take(&mut self.text_scratch);
                    }
                    MessagesContentBlock::Thinking { thinking, .. } => {
                        *thinking = std::mem::take(&mut self.text_scratch);
                    }
                    MessagesContentBlock::ToolUse { input, .. }
                    | MessagesContentBlock::ServerToolUse { input, .. } => {
                        let scratch = std::mem::take(&mut self.json_scratch);
                        // A tool call with no argument deltas means `{}`.
                        *input = if scratch.is_empty() {
                            Value::Object(serde_json::Map::new())
                        } else {
                            serde_json::from_slice(&scratch)?
                        };
                    }
                    MessagesContentBlock::WebSearchToolResult { .. } => {}
                    // Rejected at ContentBlockStart.
                    MessagesContentBlock::RedactedThinking { .. } => {}
                }
            }
        }

        Ok(())
    }

    /// Consume the builder and return the assembled message.
    pub fn finish(self) -> Message {
        self.message
    }
}
