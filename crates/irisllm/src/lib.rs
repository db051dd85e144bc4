//! irisllm: a streaming translation library for an Anthropic-compatible
//! gateway. It consumes Server-Sent-Events streams in the OpenAI
//! chat-completions or OpenAI Responses vocabulary and re-emits them in the
//! Anthropic Messages vocabulary, preserving content, block ordering,
//! tool-call shape, reasoning blocks, usage accounting and stop semantics.

pub mod apis;
pub mod providers;
pub mod transforms;

// Re-export the main types callers interact with.
pub use apis::anthropic::{Message, MessagesStreamEvent};
pub use apis::sse::{SseFrame, SseStreamIter};
pub use providers::error::{ErrorSource, ProviderError};
pub use transforms::chat_completions_stream::ChatCompletionsStream;
pub use transforms::message_builder::{MessageBuildError, MessageBuilder};
pub use transforms::responses_stream::ResponsesStream;
pub use transforms::{StreamError, TranslateOptions};

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
pub const MESSAGES_PATH: &str = "/v1/messages";
pub const RESPONSES_PATH: &str = "/v1/responses";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_stream_translates_and_rebuilds() {
        // A chat-completions upstream translated to Anthropic events, then
        // folded back into a complete message.
        let sse_data = r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-4","choices":[{"index":0,"delta":{"role":"assistant","content":"Hello"},"finish_reason":null}]}

data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1694268190,"model":"gpt-4","choices":[{"index":0,"delta":{"content":" world"},"finish_reason":"stop"}]}

data: [DONE]
"#;

        let frames = SseStreamIter::try_from(sse_data.as_bytes()).unwrap();
        let stream = ChatCompletionsStream::new(frames, TranslateOptions::default());

        let mut builder = MessageBuilder::new();
        for event in stream {
            builder.add(&event.unwrap()).unwrap();
        }

        let message = builder.finish();
        assert_eq!(message.id, "chatcmpl-123");
        assert_eq!(message.model, "gpt-4");
        assert_eq!(message.content.len(), 1);
        match &message.content[0] {
            apis::anthropic::MessagesContentBlock::Text { text, .. } => {
                assert_eq!(text, "Hello world");
            }
            other => panic!("expected text block, got {other:?}"),
        }
        assert_eq!(
            message.stop_reason,
            Some(apis::anthropic::MessagesStopReason::EndTurn)
        );
    }

    #[test]
    fn test_endpoint_constants_resolve_apis() {
        use apis::{AnthropicApi, ApiDefinition, OpenAIApi};

        assert_eq!(
            OpenAIApi::from_endpoint(CHAT_COMPLETIONS_PATH),
            Some(OpenAIApi::ChatCompletions)
        );
        assert_eq!(
            OpenAIApi::from_endpoint(RESPONSES_PATH),
            Some(OpenAIApi::Responses)
        );
        assert_eq!(
            AnthropicApi::from_endpoint(MESSAGES_PATH),
            Some(AnthropicApi::Messages)
        );
        assert_eq!(AnthropicApi::from_endpoint("/v1/unknown"), None);
    }
}
