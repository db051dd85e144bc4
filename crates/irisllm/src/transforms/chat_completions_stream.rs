use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::apis::anthropic::{
    MessagesMessageDelta, MessagesRole, MessagesStopReason, MessagesStreamEvent,
    MessagesStreamMessage, MessagesUsage,
};
use crate::apis::openai::{ChatCompletionsStreamResponse, ChatCompletionsUsage, ReasoningDetail};
use crate::apis::sse::{SseFrame, SseStreamIter};
use crate::transforms::block_sequencer::BlockSequencer;
use crate::transforms::{scale_tokens, StreamError, TranslateOptions};

/// Append-only sink receiving every decoded upstream chunk, for callers that
/// assemble the upstream response independently of the translation.
pub type ChunkSink = Arc<Mutex<Vec<ChatCompletionsStreamResponse>>>;

/// Map a chat-completions finish reason onto the Anthropic stop vocabulary.
/// Unrecognized reasons defer to the aggregator's native reason when one is
/// present, else to `pause_turn`.
pub(crate) fn map_finish_reason(finish: &str, native: Option<&str>) -> MessagesStopReason {
    match finish {
        "stop" => MessagesStopReason::EndTurn,
        "length" => MessagesStopReason::MaxTokens,
        "content_filter" => MessagesStopReason::Refusal,
        "tool_calls" => MessagesStopReason::ToolUse,
        _ => match native.filter(|reason| !reason.is_empty()) {
            Some(native) => MessagesStopReason::Other(native.to_string()),
            None => MessagesStopReason::PauseTurn,
        },
    }
}

/// Translates a chat-completions SSE stream into Anthropic Messages events.
///
/// One instance per upstream stream. The consumer pulls; each pull either
/// drains an already-translated event or reads exactly as many upstream
/// frames as needed to produce the next one. Dropping the iterator drops the
/// upstream reader with it.
pub struct ChatCompletionsStream<I> {
    frames: SseStreamIter<I>,
    sequencer: BlockSequencer,
    options: TranslateOptions,
    pending: VecDeque<MessagesStreamEvent>,
    chunk_sink: Option<ChunkSink>,
    started: bool,
    finished: bool,
    stop_reason: Option<MessagesStopReason>,
    usage: Option<MessagesUsage>,
}

impl<R: io::BufRead> ChatCompletionsStream<io::Lines<R>> {
    /// Take ownership of the upstream body reader for the stream's lifetime.
    pub fn from_reader(reader: R, options: TranslateOptions) -> Self {
        Self::new(SseStreamIter::new(reader.lines()), options)
    }
}

impl<I> ChatCompletionsStream<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(frames: SseStreamIter<I>, options: TranslateOptions) -> Self {
        Self {
            frames,
            sequencer: BlockSequencer::new(),
            options,
            pending: VecDeque::new(),
            chunk_sink: None,
            started: false,
            finished: false,
            stop_reason: None,
            usage: None,
        }
    }

    pub fn with_chunk_sink(mut self, sink: ChunkSink) -> Self {
        self.chunk_sink = Some(sink);
        self
    }

    fn start_message(&mut self, id: String, model: &str) {
        self.pending.push_back(MessagesStreamEvent::MessageStart {
            message: MessagesStreamMessage {
                id,
                obj_type: "message".to_string(),
                role: MessagesRole::Assistant,
                content: vec![],
                model: model.to_string(),
                stop_reason: None,
                stop_sequence: None,
                usage: MessagesUsage {
                    input_tokens: scale_tokens(self.options.input_tokens, self.options.resize_factor),
                    output_tokens: 1,
                    cache_creation_input_tokens: None,
                    cache_read_input_tokens: None,
                },
            },
        });
        self.started = true;
    }

    fn scaled_usage(&self, usage: &ChatCompletionsUsage) -> MessagesUsage {
        let factor = self.options.resize_factor;
        MessagesUsage {
            input_tokens: scale_tokens(usage.prompt_tokens, factor),
            output_tokens: scale_tokens(usage.completion_tokens, factor),
            cache_creation_input_tokens: None,
            cache_read_input_tokens: usage
                .cached_tokens()
                .map(|cached| scale_tokens(cached, factor)),
        }
    }

    fn ingest(&mut self, frame: &SseFrame) -> Result<(), StreamError> {
        let chunk = ChatCompletionsStreamResponse::try_from(frame.data.as_bytes())
            .map_err(|err| StreamError::decode("chat completion chunk", err))?;

        if let Some(sink) = &self.chunk_sink {
            if let Ok(mut chunks) = sink.lock() {
                chunks.push(chunk.clone());
            }
        }

        if !self.started {
            // Chunks without an id still need a stable message id downstream.
            let id = if chunk.id.is_empty() {
                format!("msg_{}", Uuid::new_v4().simple())
            } else {
                chunk.id.clone()
            };
            self.start_message(id, &chunk.model);
            if let (Some(sink), Some(provider)) = (&self.options.provider_sink, &chunk.provider) {
                let _ = sink.set(provider.clone());
            }
        }

        // Usage may ride on a trailing chunk with no choices at all.
        if let Some(usage) = &chunk.usage {
            self.usage = Some(self.scaled_usage(usage));
        }

        let Some(choice) = chunk.choices.first() else {
            return Ok(());
        };

        // Field order matters: thinking-flavored reasoning first, then text,
        // then tool calls, then encrypted reasoning, so signatures land after
        // the thinking content they certify.
        if let Some(details) = &choice.delta.reasoning_details {
            for detail in details {
                let thinking = match detail {
                    ReasoningDetail::Text { text } => text.as_deref(),
                    ReasoningDetail::Summary { summary } => summary.as_deref(),
                    ReasoningDetail::Encrypted { .. } => None,
                };
                if let Some(thinking) = thinking {
                    let events = self.sequencer.thinking_delta(thinking);
                    self.pending.extend(events);
                }
            }
        }

        if let Some(content) = &choice.delta.content {
            let events = self.sequencer.text_delta(content);
            self.pending.extend(events);
        }

        if let Some(tool_calls) = &choice.delta.tool_calls {
            for call in tool_calls {
                if let Some(id) = call.id.as_deref().filter(|id| !id.is_empty()) {
                    let name = call
                        .function
                        .as_ref()
                        .and_then(|f| f.name.as_deref())
                        .unwrap_or_default();
                    let events = self.sequencer.open_tool_use(id, name);
                    self.pending.extend(events);
                }
                if let Some(arguments) = call.function.as_ref().and_then(|f| f.arguments.as_deref())
                {
                    let events = self.sequencer.input_json_delta(arguments);
                    self.pending.extend(events);
                }
            }
        }

        if let Some(details) = &choice.delta.reasoning_details {
            for detail in details {
                if let ReasoningDetail::Encrypted { id, data } = detail {
                    let Some(data) = data.as_deref().filter(|data| !data.is_empty()) else {
                        continue;
                    };
                    let signature = match id.as_deref().filter(|id| !id.is_empty()) {
                        Some(id) => {
                            format!("{id}{}{data}", self.options.reasoning_delimiter)
                        }
                        None => data.to_string(),
                    };
                    let events = self.sequencer.signature_delta(&signature);
                    self.pending.extend(events);
                }
            }
        }

        // Some aggregators repeat finish_reason across chunks; only the
        // first one is authoritative. A bare native_finish_reason counts.
        if self.stop_reason.is_none() {
            let finish = choice.finish_reason.as_deref().unwrap_or("");
            let native = choice.native_finish_reason.as_deref();
            if !finish.is_empty() || native.is_some_and(|reason| !reason.is_empty()) {
                self.stop_reason = Some(map_finish_reason(finish, native));
            }
        }

        Ok(())
    }

    fn finish(&mut self) {
        // A stream with no chunks still gets the complete envelope so the
        // output grammar holds.
        if !self.started {
            self.start_message(String::new(), "");
        }
        let events = self.sequencer.finalize();
        self.pending.extend(events);
        self.pending.push_back(MessagesStreamEvent::MessageDelta {
            delta: MessagesMessageDelta {
                stop_reason: self
                    .stop_reason
                    .take()
                    .unwrap_or(MessagesStopReason::PauseTurn),
                stop_sequence: None,
            },
            usage: self.usage.take(),
        });
        self.pending.push_back(MessagesStreamEvent::MessageStop);
        self.finished = true;
    }
}

impl<I> Iterator for ChatCompletionsStream<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<MessagesStreamEvent, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }
            match self.frames.next() {
                None => self.finish(),
                Some(Err(err)) => {
                    self.finished = true;
                    return Some(Err(err.into()));
                }
                Some(Ok(frame)) => {
                    if let Err(err) = self.ingest(&frame) {
                        self.finished = true;
                        return Some(Err(err));
                    }
                }
            }
        }
    }
}
