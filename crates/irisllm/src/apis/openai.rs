use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::ApiDefinition;
use crate::{CHAT_COMPLETIONS_PATH, RESPONSES_PATH};

// Enum for all supported OpenAI APIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenAIApi {
    ChatCompletions,
    Responses,
}

impl ApiDefinition for OpenAIApi {
    fn endpoint(&self) -> &'static str {
        match self {
            OpenAIApi::ChatCompletions => CHAT_COMPLETIONS_PATH,
            OpenAIApi::Responses => RESPONSES_PATH,
        }
    }

    fn from_endpoint(endpoint: &str) -> Option<Self> {
        match endpoint {
            CHAT_COMPLETIONS_PATH => Some(OpenAIApi::ChatCompletions),
            RESPONSES_PATH => Some(OpenAIApi::Responses),
            _ => None,
        }
    }

    fn supports_streaming(&self) -> bool {
        match self {
            OpenAIApi::ChatCompletions | OpenAIApi::Responses => true,
        }
    }

    fn supports_tools(&self) -> bool {
        match self {
            OpenAIApi::ChatCompletions | OpenAIApi::Responses => true,
        }
    }

    fn all_variants() -> Vec<Self> {
        vec![OpenAIApi::ChatCompletions, OpenAIApi::Responses]
    }
}

/// One chunk of a chat-completions SSE stream. The `provider` field is
/// populated by aggregators (OpenRouter) that front multiple upstreams.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatCompletionsStreamResponse {
    #[serde(default)]
    pub id: String,
    pub object: Option<String>,
    pub created: Option<u64>,
    #[serde(default)]
    pub model: String,
    pub provider: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    pub usage: Option<ChatCompletionsUsage>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
    pub native_finish_reason: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChunkDelta {
    pub role: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCallDelta>>,
    pub reasoning_details: Option<Vec<ReasoningDetail>>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCallDelta {
    pub index: Option<u32>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub call_type: Option<String>,
    pub function: Option<FunctionCallDelta>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionCallDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Reasoning fragments as emitted by OpenRouter. Text and summary kinds feed
/// thinking blocks; the encrypted kind carries the provider signature.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ReasoningDetail {
    #[serde(rename = "reasoning.text")]
    Text { text: Option<String> },
    #[serde(rename = "reasoning.summary")]
    Summary { summary: Option<String> },
    #[serde(rename = "reasoning.encrypted")]
    Encrypted {
        id: Option<String>,
        data: Option<String>,
    },
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ChatCompletionsUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    pub prompt_tokens_details: Option<PromptTokensDetails>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: u32,
}

impl ChatCompletionsUsage {
    pub fn cached_tokens(&self) -> Option<u32> {
        self.prompt_tokens_details.as_ref().map(|d| d.cached_tokens)
    }
}

impl TryFrom<&[u8]> for ChatCompletionsStreamResponse {
    type Error = serde_json::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_chunk_with_tool_call_delta() {
        let chunk: ChatCompletionsStreamResponse = serde_json::from_value(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion.chunk",
            "created": 1764353027u64,
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "index": 0,
                "delta": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "index": 0,
                        "id": "call_2Uzw",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": ""}
                    }]
                },
                "logprobs": null,
                "finish_reason": null
            }]
        }))
        .unwrap();

        let call = &chunk.choices[0].delta.tool_calls.as_ref().unwrap()[0];
        assert_eq!(call.id.as_deref(), Some("call_2Uzw"));
        assert_eq!(
            call.function.as_ref().unwrap().name.as_deref(),
            Some("get_weather")
        );
        assert_eq!(call.function.as_ref().unwrap().arguments.as_deref(), Some(""));
    }

    #[test]
    fn test_chunk_with_reasoning_details_and_provider() {
        let chunk: ChatCompletionsStreamResponse = serde_json::from_value(json!({
            "id": "gen-1",
            "model": "anthropic/claude-sonnet-4",
            "provider": "Anthropic",
            "choices": [{
                "index": 0,
                "delta": {
                    "reasoning_details": [
                        {"type": "reasoning.text", "text": "Let me think"},
                        {"type": "reasoning.encrypted", "id": "rs_1", "data": "opaque", "format": "anthropic"}
                    ]
                },
                "finish_reason": null
            }]
        }))
        .unwrap();

        assert_eq!(chunk.provider.as_deref(), Some("Anthropic"));
        let details = chunk.choices[0].delta.reasoning_details.as_ref().unwrap();
        assert_eq!(
            details[0],
            ReasoningDetail::Text {
                text: Some("Let me think".to_string())
            }
        );
        assert_eq!(
            details[1],
            ReasoningDetail::Encrypted {
                id: Some("rs_1".to_string()),
                data: Some("opaque".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_reasoning_detail_kind_is_an_error() {
        let result = serde_json::from_value::<ReasoningDetail>(json!({
            "type": "reasoning.hologram",
            "data": "?"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_usage_with_cached_tokens() {
        let usage: ChatCompletionsUsage = serde_json::from_value(json!({
            "prompt_tokens": 100,
            "completion_tokens": 40,
            "total_tokens": 140,
            "prompt_tokens_details": {"cached_tokens": 20}
        }))
        .unwrap();

        assert_eq!(usage.prompt_tokens, 100);
        assert_eq!(usage.cached_tokens(), Some(20));

        let bare: ChatCompletionsUsage =
            serde_json::from_value(json!({"prompt_tokens": 5, "completion_tokens": 1})).unwrap();
        assert_eq!(bare.cached_tokens(), None);
    }

    #[test]
    fn test_native_finish_reason_survives_decoding() {
        let chunk: ChatCompletionsStreamResponse = serde_json::from_value(json!({
            "id": "gen-2",
            "model": "m",
            "choices": [{
                "index": 0,
                "delta": {},
                "finish_reason": "error",
                "native_finish_reason": "SAFETY"
            }]
        }))
        .unwrap();

        assert_eq!(chunk.choices[0].finish_reason.as_deref(), Some("error"));
        assert_eq!(
            chunk.choices[0].native_finish_reason.as_deref(),
            Some("SAFETY")
        );
    }
}
