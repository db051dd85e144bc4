pub mod anthropic;
pub mod openai;
pub mod openai_responses;
pub mod sse;

// Explicit exports to avoid naming conflicts between the provider models
pub use anthropic::{AnthropicApi, Message, MessagesStreamEvent};
pub use openai::{ChatCompletionsStreamResponse, OpenAIApi};
pub use openai_responses::ResponsesStreamEvent;

pub trait ApiDefinition {
    /// Returns the endpoint path for this API
    fn endpoint(&self) -> &'static str;

    /// Creates an API instance from an endpoint path
    fn from_endpoint(endpoint: &str) -> Option<Self>
    where
        Self: Sized;

    /// Returns whether this API supports streaming responses
    fn supports_streaming(&self) -> bool;

    /// Returns whether this API supports tool/function calling
    fn supports_tools(&self) -> bool;

    /// Returns all variants of this API enum
    fn all_variants() -> Vec<Self>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CHAT_COMPLETIONS_PATH, MESSAGES_PATH, RESPONSES_PATH};

    #[test]
    fn test_api_detection_from_endpoints() {
        let endpoints = vec![
            CHAT_COMPLETIONS_PATH,
            RESPONSES_PATH,
            MESSAGES_PATH,
            "/v1/unknown",
        ];

        let mut detected = Vec::new();
        for endpoint in endpoints {
            if let Some(api) = OpenAIApi::from_endpoint(endpoint) {
                detected.push(format!("OpenAI: {:?}", api));
            } else if let Some(api) = AnthropicApi::from_endpoint(endpoint) {
                detected.push(format!("Anthropic: {:?}", api));
            } else {
                detected.push("Unknown API".to_string());
            }
        }

        assert_eq!(
            detected,
            vec![
                "OpenAI: ChatCompletions",
                "OpenAI: Responses",
                "Anthropic: Messages",
                "Unknown API"
            ]
        );
    }

    #[test]
    fn test_all_variants_have_endpoints() {
        for variant in OpenAIApi::all_variants() {
            assert!(variant.endpoint().starts_with('/'));
            assert!(variant.supports_streaming());
        }
        for variant in AnthropicApi::all_variants() {
            assert!(variant.endpoint().starts_with('/'));
            assert!(variant.supports_tools());
        }
    }
}
