use serde_json::Value;

use crate::apis::anthropic::{MessagesContentBlock, MessagesContentDelta, MessagesStreamEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    None,
    Text,
    Thinking,
    ToolUse,
}

/// State machine that turns kind-typed delta signals into Anthropic's strict
/// block grammar: every run of same-kind deltas is wrapped in a
/// `content_block_start`/`content_block_stop` pair, indices are contiguous
/// from zero, and a change of kind (or of tool identity) closes the open
/// block before starting the next one.
///
/// Empty text, thinking, signature and input-json payloads are suppressed
/// outright: they produce no events and never open a block. Anthropic
/// clients reject empty delta content.
#[derive(Debug)]
pub struct BlockSequencer {
    kind: BlockKind,
    index: u32,
    opened_any: bool,
    tool_id: String,
    pending_signatures: Vec<String>,
    pending_citations: Vec<Value>,
}

impl Default for BlockSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockSequencer {
    pub fn new() -> Self {
        Self {
            kind: BlockKind::None,
            index: 0,
            opened_any: false,
            tool_id: String::new(),
            pending_signatures: Vec::new(),
            pending_citations: Vec::new(),
        }
    }

    /// Close the open block, if any, bumping the index for the next one.
    fn close_open_block(&mut self, events: &mut Vec<MessagesStreamEvent>) {
        if self.kind != BlockKind::None {
            events.push(MessagesStreamEvent::ContentBlockStop { index: self.index });
            self.index += 1;
            self.kind = BlockKind::None;
            self.tool_id.clear();
        }
    }

    fn start_block(&mut self, kind: BlockKind, block: MessagesContentBlock) -> Vec<MessagesStreamEvent> {
        let mut events = Vec::new();
        self.close_open_block(&mut events);
        events.push(MessagesStreamEvent::ContentBlockStart {
            index: self.index,
            content_block: block,
        });
        self.kind = kind;
        self.opened_any = true;

        // Deltas that arrived before a compatible block existed attach to
        // this one.
        match kind {
            BlockKind::Thinking => {
                for signature in self.pending_signatures.drain(..) {
                    events.push(MessagesStreamEvent::ContentBlockDelta {
                        index: self.index,
                        delta: MessagesContentDelta::SignatureDelta { signature },
                    });
                }
            }
            BlockKind::Text => {
                for citation in self.pending_citations.drain(..) {
                    events.push(MessagesStreamEvent::ContentBlockDelta {
                        index: self.index,
                        delta: MessagesContentDelta::CitationsDelta { citation },
                    });
                }
            }
            _ => {}
        }

        events
    }

    fn ensure(&mut self, kind: BlockKind) -> Vec<MessagesStreamEvent> {
        if self.kind == kind {
            return Vec::new();
        }
        let block = match kind {
            BlockKind::Text => MessagesContentBlock::empty_text(),
            BlockKind::Thinking => MessagesContentBlock::empty_thinking(),
            // Reached only when input-json arrives without a preceding tool
            // open; the identity stays empty rather than inventing one.
            BlockKind::ToolUse => MessagesContentBlock::tool_use("", ""),
            BlockKind::None => unreachable!("ensure is never called with BlockKind::None"),
        };
        self.start_block(kind, block)
    }

    fn delta(&self, delta: MessagesContentDelta) -> MessagesStreamEvent {
        MessagesStreamEvent::ContentBlockDelta {
            index: self.index,
            delta,
        }
    }

    pub fn open_text(&mut self) -> Vec<MessagesStreamEvent> {
        self.ensure(BlockKind::Text)
    }

    pub fn open_thinking(&mut self) -> Vec<MessagesStreamEvent> {
        self.ensure(BlockKind::Thinking)
    }

    /// Open a tool-use block. Re-opening the tool that is already open (or
    /// signalling with an empty id while one is open) is a no-op; a
    /// different non-empty id closes the current block and starts a new one.
    pub fn open_tool_use(&mut self, id: &str, name: &str) -> Vec<MessagesStreamEvent> {
        if self.kind == BlockKind::ToolUse && (id.is_empty() || id == self.tool_id) {
            return Vec::new();
        }
        let events = self.start_block(BlockKind::ToolUse, MessagesContentBlock::tool_use(id, name));
        self.tool_id = id.to_string();
        events
    }

    pub fn text_delta(&mut self, text: &str) -> Vec<MessagesStreamEvent> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut events = self.ensure(BlockKind::Text);
        events.push(self.delta(MessagesContentDelta::TextDelta {
            text: text.to_string(),
        }));
        events
    }

    pub fn thinking_delta(&mut self, thinking: &str) -> Vec<MessagesStreamEvent> {
        if thinking.is_empty() {
            return Vec::new();
        }
        let mut events = self.ensure(BlockKind::Thinking);
        events.push(self.delta(MessagesContentDelta::ThinkingDelta {
            thinking: thinking.to_string(),
        }));
        events
    }

    pub fn input_json_delta(&mut self, partial_json: &str) -> Vec<MessagesStreamEvent> {
        if partial_json.is_empty() {
            return Vec::new();
        }
        let mut events = self.ensure(BlockKind::ToolUse);
        events.push(self.delta(MessagesContentDelta::InputJsonDelta {
            partial_json: partial_json.to_string(),
        }));
        events
    }

    /// Signatures belong to thinking blocks. With no thinking block open the
    /// delta is held back until one opens; if none ever does it is dropped.
    pub fn signature_delta(&mut self, signature: &str) -> Vec<MessagesStreamEvent> {
        if signature.is_empty() {
            return Vec::new();
        }
        if self.kind == BlockKind::Thinking {
            vec![self.delta(MessagesContentDelta::SignatureDelta {
                signature: signature.to_string(),
            })]
        } else {
            self.pending_signatures.push(signature.to_string());
            Vec::new()
        }
    }

    /// Citations belong to text blocks; buffered like signatures otherwise.
    pub fn citations_delta(&mut self, citation: Value) -> Vec<MessagesStreamEvent> {
        if self.kind == BlockKind::Text {
            vec![self.delta(MessagesContentDelta::CitationsDelta { citation })]
        } else {
            self.pending_citations.push(citation);
            Vec::new()
        }
    }

    /// Close the open block. Never opens a new one.
    pub fn finalize(&mut self) -> Vec<MessagesStreamEvent> {
        let mut events = Vec::new();
        self.close_open_block(&mut events);
        events
    }

    /// Whether any block has been opened over the stream's lifetime.
    pub fn opened_any(&self) -> bool {
        self.opened_any
    }
}
