use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

// ============================================================================
// Response object and supporting types
// ============================================================================

/// The response envelope carried by lifecycle events. Only the fields the
/// translator consumes are modeled; everything else is ignored on decode.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResponsesResponse {
    #[serde(default)]
    pub id: String,
    pub object: Option<String>,
    pub created_at: Option<i64>,
    #[serde(default)]
    pub model: String,
    pub status: Option<ResponseStatus>,
    pub error: Option<ResponsesError>,
    pub incomplete_details: Option<IncompleteDetails>,
    pub usage: Option<ResponseUsage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Incomplete,
    Cancelled,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResponsesError {
    pub code: Option<String>,
    pub message: String,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IncompleteDetails {
    pub reason: Option<String>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ResponseUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    pub input_tokens_details: Option<InputTokensDetails>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct InputTokensDetails {
    #[serde(default)]
    pub cached_tokens: u32,
}

impl ResponseUsage {
    pub fn cached_tokens(&self) -> Option<u32> {
        self.input_tokens_details.as_ref().map(|d| d.cached_tokens)
    }
}

/// Output items announced by `response.output_item.added`. An unrecognized
/// item discriminator is a hard decode failure.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        id: String,
        role: Option<String>,
    },
    FunctionCall {
        id: String,
        call_id: String,
        name: Option<String>,
        arguments: Option<String>,
    },
    Reasoning {
        id: String,
        summary: Option<Vec<Value>>,
    },
}

// ============================================================================
// Streaming lifecycle events
// ============================================================================

/// Stream events for the Responses API. The `Unknown` catch-all keeps
/// translation alive across future top-level event kinds; inner unions stay
/// strict.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ResponsesStreamEvent {
    #[serde(rename = "response.created")]
    Created {
        response: ResponsesResponse,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.in_progress")]
    InProgress {
        response: ResponsesResponse,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.completed")]
    Completed {
        response: ResponsesResponse,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.failed")]
    Failed {
        response: ResponsesResponse,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.incomplete")]
    Incomplete {
        response: ResponsesResponse,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        output_index: u32,
        item: OutputItem,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        output_index: u32,
        item: OutputItem,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.content_part.added")]
    ContentPartAdded {
        item_id: String,
        output_index: u32,
        content_index: u32,
        part: Value,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.content_part.done")]
    ContentPartDone {
        item_id: String,
        output_index: u32,
        content_index: u32,
        part: Value,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        item_id: String,
        output_index: u32,
        content_index: Option<u32>,
        delta: String,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.output_text.done")]
    OutputTextDone {
        item_id: String,
        output_index: u32,
        content_index: Option<u32>,
        text: String,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.reasoning_text.delta")]
    ReasoningTextDelta {
        item_id: Option<String>,
        output_index: Option<u32>,
        delta: String,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.reasoning_text.done")]
    ReasoningTextDone {
        item_id: Option<String>,
        output_index: Option<u32>,
        text: Option<String>,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.reasoning_summary_text.delta")]
    ReasoningSummaryTextDelta {
        item_id: Option<String>,
        output_index: Option<u32>,
        delta: String,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.reasoning_summary_text.done")]
    ReasoningSummaryTextDone {
        item_id: Option<String>,
        output_index: Option<u32>,
        text: Option<String>,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {
        item_id: String,
        output_index: Option<u32>,
        delta: String,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        item_id: String,
        output_index: Option<u32>,
        arguments: Option<String>,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.refusal.delta")]
    RefusalDelta {
        item_id: Option<String>,
        output_index: Option<u32>,
        delta: String,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "response.refusal.done")]
    RefusalDone {
        item_id: Option<String>,
        output_index: Option<u32>,
        refusal: Option<String>,
        sequence_number: Option<i64>,
    },

    #[serde(rename = "error")]
    Error {
        code: Option<String>,
        message: String,
        sequence_number: Option<i64>,
    },

    /// Any event kind this crate does not recognize. Ignored by translation.
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl TryFrom<&[u8]> for ResponsesStreamEvent {
    type Error = serde_json::Error;

    fn try_from(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
