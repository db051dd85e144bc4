use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use log::debug;
use uuid::Uuid;

use crate::apis::anthropic::{
    MessagesMessageDelta, MessagesRole, MessagesStopReason, MessagesStreamEvent,
    MessagesStreamMessage, MessagesUsage,
};
use crate::apis::openai_responses::{
    OutputItem, ResponseStatus, ResponseUsage, ResponsesResponse, ResponsesStreamEvent,
};
use crate::apis::sse::{SseFrame, SseStreamIter};
use crate::providers::error::{ErrorSource, ProviderError};
use crate::transforms::block_sequencer::BlockSequencer;
use crate::transforms::{scale_tokens, StreamError, TranslateOptions};

/// Append-only sink receiving every decoded upstream lifecycle event.
pub type EventSink = Arc<Mutex<Vec<ResponsesStreamEvent>>>;

/// Translates an OpenAI Responses lifecycle stream into Anthropic Messages
/// events. Unlike the chat translator, block boundaries mostly arrive
/// explicitly (`output_item.added`); deltas only need re-homing onto the
/// block sequencer.
pub struct ResponsesStream<I> {
    frames: SseStreamIter<I>,
    sequencer: BlockSequencer,
    options: TranslateOptions,
    pending: VecDeque<MessagesStreamEvent>,
    event_sink: Option<EventSink>,
    started: bool,
    finished: bool,
    stop_reason: Option<MessagesStopReason>,
    usage: Option<MessagesUsage>,
    // item id -> (call_id, function name), from output_item.added
    functions: HashMap<String, (String, String)>,
}

impl<R: io::BufRead> ResponsesStream<io::Lines<R>> {
    /// Take ownership of the upstream body reader for the stream's lifetime.
    pub fn from_reader(reader: R, options: TranslateOptions) -> Self {
        Self::new(SseStreamIter::new(reader.lines()), options)
    }
}

impl<I> ResponsesStream<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(frames: SseStreamIter<I>, options: TranslateOptions) -> Self {
        Self {
            frames,
            sequencer: BlockSequencer::new(),
            options,
            pending: VecDeque::new(),
            event_sink: None,
            started: false,
            finished: false,
            stop_reason: None,
            usage: None,
            functions: HashMap::new(),
        }
    }

    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.event_sink = Some(sink);
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

    /// Streams are expected to open with `response.created`; if content
    /// arrives first anyway, a message envelope is synthesized so the output
    /// grammar holds.
    fn ensure_started(&mut self) {
        if !self.started {
            self.start_message(format!("msg_{}", Uuid::new_v4().simple()), "");
        }
    }

    fn scaled_usage(&self, usage: &ResponseUsage) -> MessagesUsage {
        let factor = self.options.resize_factor;
        MessagesUsage {
            input_tokens: scale_tokens(usage.input_tokens, factor),
            output_tokens: scale_tokens(usage.output_tokens, factor),
            cache_creation_input_tokens: None,
            cache_read_input_tokens: usage
                .cached_tokens()
                .map(|cached| scale_tokens(cached, factor)),
        }
    }

    fn set_stop_reason(&mut self, reason: MessagesStopReason) {
        if self.stop_reason.is_none() {
            self.stop_reason = Some(reason);
        }
    }

    /// Open the tool block for a function-call item, resolving its identity
    /// through the metadata recorded at `output_item.added`. A delta whose
    /// item was never announced keeps the item id itself as the identity.
    fn open_function_item(&mut self, item_id: &str) {
        let (call_id, name) = match self.functions.get(item_id) {
            Some((call_id, name)) => (call_id.clone(), name.clone()),
            None => (item_id.to_string(), String::new()),
        };
        let events = self.sequencer.open_tool_use(&call_id, &name);
        self.pending.extend(events);
    }

    fn capture_completed(&mut self, response: &ResponsesResponse) {
        if let Some(usage) = &response.usage {
            self.usage = Some(self.scaled_usage(usage));
        }
        let reason = match response.status {
            Some(ResponseStatus::Completed) | None => MessagesStopReason::EndTurn,
            Some(ResponseStatus::Failed) => MessagesStopReason::Refusal,
            Some(ResponseStatus::Incomplete) => incomplete_stop_reason(response),
            Some(_) => MessagesStopReason::PauseTurn,
        };
        self.set_stop_reason(reason);
    }

    fn ingest(&mut self, frame: &SseFrame) -> Result<(), StreamError> {
        let event = ResponsesStreamEvent::try_from(frame.data.as_bytes())
            .map_err(|err| StreamError::decode("responses stream event", err))?;

        if let Some(sink) = &self.event_sink {
            if let Ok(mut events) = sink.lock() {
                events.push(event.clone());
            }
        }

        match &event {
            ResponsesStreamEvent::Created { response, .. } => {
                if !self.started {
                    self.start_message(response.id.clone(), &response.model);
                }
            }

            ResponsesStreamEvent::OutputItemAdded { item, .. } => match item {
                OutputItem::FunctionCall {
                    id, call_id, name, ..
                } => {
                    self.ensure_started();
                    self.functions
                        .insert(id.clone(), (call_id.clone(), name.clone().unwrap_or_default()));
                    let events = self
                        .sequencer
                        .open_tool_use(call_id, name.as_deref().unwrap_or_default());
                    self.pending.extend(events);
                }
                OutputItem::Reasoning { .. } => {
                    self.ensure_started();
                    let events = self.sequencer.open_thinking();
                    self.pending.extend(events);
                }
                OutputItem::Message { .. } => {}
            },

            ResponsesStreamEvent::OutputTextDelta { delta, .. } => {
                self.ensure_started();
                let events = self.sequencer.text_delta(delta);
                self.pending.extend(events);
            }

            ResponsesStreamEvent::ReasoningTextDelta { delta, .. }
            | ResponsesStreamEvent::ReasoningSummaryTextDelta { delta, .. } => {
                self.ensure_started();
                let events = self.sequencer.thinking_delta(delta);
                self.pending.extend(events);
            }

            ResponsesStreamEvent::FunctionCallArgumentsDelta { item_id, delta, .. } => {
                self.ensure_started();
                self.open_function_item(item_id);
                let events = self.sequencer.input_json_delta(delta);
                self.pending.extend(events);
            }

            // Refusals surface to the caller as plain text.
            ResponsesStreamEvent::RefusalDelta { delta, .. } => {
                self.ensure_started();
                let events = self.sequencer.text_delta(delta);
                self.pending.extend(events);
            }

            ResponsesStreamEvent::Completed { response, .. } => {
                self.capture_completed(response);
            }

            ResponsesStreamEvent::Failed { .. } => {
                self.set_stop_reason(MessagesStopReason::Refusal);
            }

            ResponsesStreamEvent::Incomplete { response, .. } => {
                let reason = incomplete_stop_reason(response);
                self.set_stop_reason(reason);
            }

            ResponsesStreamEvent::Error { code, message, .. } => {
                return Err(StreamError::Provider(ProviderError::new(
                    ErrorSource::OpenAI,
                    code.clone().unwrap_or_else(|| "error".to_string()),
                    message.clone(),
                    None,
                )));
            }

            // Structural markers carry nothing the translation needs.
            ResponsesStreamEvent::InProgress { .. }
            | ResponsesStreamEvent::OutputItemDone { .. }
            | ResponsesStreamEvent::ContentPartAdded { .. }
            | ResponsesStreamEvent::ContentPartDone { .. }
            | ResponsesStreamEvent::OutputTextDone { .. }
            | ResponsesStreamEvent::ReasoningTextDone { .. }
            | ResponsesStreamEvent::ReasoningSummaryTextDone { .. }
            | ResponsesStreamEvent::FunctionCallArgumentsDone { .. }
            | ResponsesStreamEvent::RefusalDone { .. } => {}

            ResponsesStreamEvent::Unknown => {
                debug!(
                    "skipping unrecognized responses event: {:?}",
                    frame.event.as_deref().unwrap_or("<data-only>")
                );
            }
        }

        Ok(())
    }

    fn finish(&mut self) {
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
                    .unwrap_or(MessagesStopReason::EndTurn),
                stop_sequence: None,
            },
            usage: self.usage.take(),
        });
        self.pending.push_back(MessagesStreamEvent::MessageStop);
        self.finished = true;
    }
}

fn incomplete_stop_reason(response: &ResponsesResponse) -> MessagesStopReason {
    match response
        .incomplete_details
        .as_ref()
        .and_then(|details| details.reason.as_deref())
    {
        Some("max_output_tokens") => MessagesStopReason::MaxTokens,
        Some("content_filter") => MessagesStopReason::Refusal,
        _ => MessagesStopReason::PauseTurn,
    }
}

impl<I> Iterator for ResponsesStream<I>
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
