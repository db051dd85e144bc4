use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

use super::sse::SseFrame;
use super::ApiDefinition;
use crate::MESSAGES_PATH;

// Enum for all supported Anthropic APIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnthropicApi {
    Messages,
}

impl ApiDefinition for AnthropicApi {
    fn endpoint(&self) -> &'static str {
        match self {
            AnthropicApi::Messages => MESSAGES_PATH,
        }
    }

    fn from_endpoint(endpoint: &str) -> Option<Self> {
        match endpoint {
            MESSAGES_PATH => Some(AnthropicApi::Messages),
            _ => None,
        }
    }

    fn supports_streaming(&self) -> bool {
        match self {
            AnthropicApi::Messages => true,
        }
    }

    fn supports_tools(&self) -> bool {
        match self {
            AnthropicApi::Messages => true,
        }
    }

    fn all_variants() -> Vec<Self> {
        vec![AnthropicApi::Messages]
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessagesRole {
    User,
    Assistant,
}

impl MessagesRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessagesRole::User => "user",
            MessagesRole::Assistant => "assistant",
        }
    }
}

/// Terminal classification of why generation ceased. Unrecognized upstream
/// finish reasons travel through the `Other` escape as an opaque string.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessagesStopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
    PauseTurn,
    Refusal,
    #[serde(untagged)]
    Other(String),
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagesUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    pub cache_creation_input_tokens: Option<u32>,
    pub cache_read_input_tokens: Option<u32>,
}

/// Content blocks as they appear inside an assistant message. The
/// translators only ever emit `text`, `thinking` and `tool_use`; the
/// remaining kinds exist so streams produced by an Anthropic upstream can be
/// folded back into a message.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum MessagesContentBlock {
    Text {
        text: String,
        citations: Option<Vec<Value>>,
    },
    Thinking {
        thinking: String,
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ServerToolUse {
        id: String,
        name: String,
        input: Value,
    },
    WebSearchToolResult {
        tool_use_id: String,
        content: Value,
    },
}

impl MessagesContentBlock {
    pub fn empty_text() -> Self {
        MessagesContentBlock::Text {
            text: String::new(),
            citations: None,
        }
    }

    pub fn empty_thinking() -> Self {
        MessagesContentBlock::Thinking {
            thinking: String::new(),
            signature: None,
        }
    }

    pub fn tool_use(id: &str, name: &str) -> Self {
        MessagesContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input: Value::Object(serde_json::Map::new()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum MessagesContentDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
    #[serde(rename = "thinking_delta")]
    ThinkingDelta { thinking: String },
    #[serde(rename = "signature_delta")]
    SignatureDelta { signature: String },
    #[serde(rename = "citations_delta")]
    CitationsDelta { citation: Value },
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessagesStreamMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub obj_type: String,
    pub role: MessagesRole,
    pub content: Vec<Value>, // Initially empty
    pub model: String,
    pub stop_reason: Option<MessagesStopReason>,
    pub stop_sequence: Option<String>,
    pub usage: MessagesUsage,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessagesMessageDelta {
    pub stop_reason: MessagesStopReason,
    pub stop_sequence: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum MessagesStreamEvent {
    MessageStart {
        message: MessagesStreamMessage,
    },
    ContentBlockStart {
        index: u32,
        content_block: MessagesContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: MessagesContentDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: MessagesMessageDelta,
        usage: Option<MessagesUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: ErrorDetail,
    },
}

/// The eight event discriminators a valid Anthropic stream may carry. Frames
/// with any other event name are skipped for forward compatibility; a known
/// name whose payload fails to decode is fatal.
pub const STREAM_EVENT_NAMES: [&str; 8] = [
    "ping",
    "error",
    "message_start",
    "message_delta",
    "message_stop",
    "content_block_start",
    "content_block_delta",
    "content_block_stop",
];

impl MessagesStreamEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            MessagesStreamEvent::MessageStart { .. } => "message_start",
            MessagesStreamEvent::ContentBlockStart { .. } => "content_block_start",
            MessagesStreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            MessagesStreamEvent::ContentBlockStop { .. } => "content_block_stop",
            MessagesStreamEvent::MessageDelta { .. } => "message_delta",
            MessagesStreamEvent::MessageStop => "message_stop",
            MessagesStreamEvent::Ping => "ping",
            MessagesStreamEvent::Error { .. } => "error",
        }
    }

    pub fn is_known_event_name(name: &str) -> bool {
        STREAM_EVENT_NAMES.contains(&name)
    }

    /// Decode a framed event from an Anthropic upstream. Frames whose event
    /// name is outside [`STREAM_EVENT_NAMES`] yield `None` so newer event
    /// kinds pass through harmlessly; a known name with an undecodable
    /// payload is an error.
    pub fn from_frame(frame: &SseFrame) -> Result<Option<Self>, serde_json::Error> {
        if let Some(name) = frame.event.as_deref() {
            if !Self::is_known_event_name(name) {
                return Ok(None);
            }
        }
        serde_json::from_str(&frame.data).map(Some)
    }

    /// Render the event in the Anthropic SSE dialect:
    /// `event: <type>\ndata: <json>\n\n`.
    pub fn to_sse(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_default();
        format!("event: {}\ndata: {}\n\n", self.event_name(), data)
    }
}

impl From<&MessagesStreamEvent> for String {
    fn from(event: &MessagesStreamEvent) -> String {
        event.to_sse()
    }
}

impl TryFrom<&[u8]> for MessagesStreamEvent {
    type Error = serde_json::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// A complete assistant message, as assembled by the
/// [`MessageBuilder`](crate::transforms::message_builder::MessageBuilder).
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub obj_type: String,
    pub role: MessagesRole,
    pub content: Vec<MessagesContentBlock>,
    pub model: String,
    pub stop_reason: Option<MessagesStopReason>,
    pub stop_sequence: Option<String>,
    pub usage: MessagesUsage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_stream_event_serde_round_trip() {
        let event_json = json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {
                "type": "text_delta",
                "text": " How"
            }
        });

        let event: MessagesStreamEvent = serde_json::from_value(event_json.clone()).unwrap();
        match &event {
            MessagesStreamEvent::ContentBlockDelta { index, delta } => {
                assert_eq!(*index, 0);
                assert_eq!(
                    delta,
                    &MessagesContentDelta::TextDelta {
                        text: " How".to_string()
                    }
                );
            }
            other => panic!("expected content_block_delta, got {other:?}"),
        }

        assert_eq!(serde_json::to_value(&event).unwrap(), event_json);
    }

    #[test]
    fn test_message_delta_without_usage_omits_field() {
        let event = MessagesStreamEvent::MessageDelta {
            delta: MessagesMessageDelta {
                stop_reason: MessagesStopReason::EndTurn,
                stop_sequence: None,
            },
            usage: None,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}})
        );
    }

    #[test]
    fn test_stop_reason_opaque_native_values() {
        let known: MessagesStopReason = serde_json::from_value(json!("max_tokens")).unwrap();
        assert_eq!(known, MessagesStopReason::MaxTokens);

        let native: MessagesStopReason = serde_json::from_value(json!("SAFETY")).unwrap();
        assert_eq!(native, MessagesStopReason::Other("SAFETY".to_string()));
        assert_eq!(serde_json::to_value(&native).unwrap(), json!("SAFETY"));
    }

    #[test]
    fn test_content_block_tagged_decoding() {
        let block: MessagesContentBlock = serde_json::from_value(json!({
            "type": "tool_use",
            "id": "toolu_01",
            "name": "get_weather",
            "input": {"location": "San Francisco, CA"}
        }))
        .unwrap();

        match block {
            MessagesContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "toolu_01");
                assert_eq!(name, "get_weather");
                assert_eq!(input["location"], "San Francisco, CA");
            }
            other => panic!("expected tool_use block, got {other:?}"),
        }

        // An unknown block discriminator is a hard decode failure.
        let unknown = serde_json::from_value::<MessagesContentBlock>(json!({
            "type": "holographic_output",
            "data": "?"
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_sse_rendering() {
        let event = MessagesStreamEvent::ContentBlockStop { index: 2 };
        assert_eq!(
            event.to_sse(),
            "event: content_block_stop\ndata: {\"type\":\"content_block_stop\",\"index\":2}\n\n"
        );

        let stop = MessagesStreamEvent::MessageStop;
        assert_eq!(
            String::from(&stop),
            "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n"
        );
    }

    #[test]
    fn test_from_frame_skips_unknown_event_names() {
        let known = SseFrame {
            event: Some("content_block_stop".to_string()),
            data: "{\"type\":\"content_block_stop\",\"index\":0}".to_string(),
        };
        assert_eq!(
            MessagesStreamEvent::from_frame(&known).unwrap(),
            Some(MessagesStreamEvent::ContentBlockStop { index: 0 })
        );

        let unknown = SseFrame {
            event: Some("content_block_preview".to_string()),
            data: "{\"type\":\"content_block_preview\"}".to_string(),
        };
        assert_eq!(MessagesStreamEvent::from_frame(&unknown).unwrap(), None);

        // A recognized name with a broken payload must not be skipped.
        let broken = SseFrame {
            event: Some("content_block_delta".to_string()),
            data: "{\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"future_delta\"}}"
                .to_string(),
        };
        assert!(MessagesStreamEvent::from_frame(&broken).is_err());
    }

    #[test]
    fn test_message_delta_usage_deserializes_partial_counts() {
        // Anthropic's message_delta usage often carries only output_tokens.
        let usage: MessagesUsage =
            serde_json::from_value(json!({"output_tokens": 15})).unwrap();
        assert_eq!(usage.input_tokens, 0);
        assert_eq!(usage.output_tokens, 15);
        assert_eq!(usage.cache_read_input_tokens, None);
    }
}
