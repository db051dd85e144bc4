use std::io;

use thiserror::Error;

/// End-of-stream sentinel used by the data-only SSE dialect.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A single framed Server-Sent Event.
///
/// `event` is present in the Anthropic dialect (`event:`/`data:` pairs) and
/// absent in the data-only dialect used by chat-completions upstreams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Error)]
pub enum SseFramerError {
    #[error("upstream read failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed event stream: {0}")]
    Protocol(String),
}

/// Line-oriented SSE framer.
///
/// Consumes any iterator of lines (such as `BufRead::lines()`, which keeps
/// the upstream body reader owned by this stream for its whole lifetime) and
/// yields [`SseFrame`]s. Blank lines and unrecognized prefixes (`:` comments,
/// `id:`, `retry:`) are skipped. A data payload equal to `[DONE]`
/// (case-insensitive) terminates the iterator normally. After an error the
/// iterator is fused.
pub struct SseStreamIter<I> {
    lines: I,
    pending_event: Option<String>,
    finished: bool,
}

impl<I> SseStreamIter<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    pub fn new(lines: I) -> Self {
        Self {
            lines,
            pending_event: None,
            finished: false,
        }
    }

    fn fail(&mut self, message: impl Into<String>) -> Option<Result<SseFrame, SseFramerError>> {
        self.finished = true;
        Some(Err(SseFramerError::Protocol(message.into())))
    }
}

impl TryFrom<&[u8]> for SseStreamIter<std::vec::IntoIter<io::Result<String>>> {
    type Error = std::str::Utf8Error;

    fn try_from(bytes: &[u8]) -> Result<Self, std::str::Utf8Error> {
        let text = std::str::from_utf8(bytes)?;
        let lines: Vec<io::Result<String>> = text.lines().map(|line| Ok(line.to_string())).collect();
        Ok(SseStreamIter::new(lines.into_iter()))
    }
}

impl<I> Iterator for SseStreamIter<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = Result<SseFrame, SseFramerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            let Some(line) = self.lines.next() else {
                break;
            };
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err.into()));
                }
            };
            let line = line.trim_end_matches('\r');

            if line.is_empty() {
                // Frame separator. An event line must be followed by its data
                // line within the same frame.
                if self.pending_event.is_some() {
                    return self.fail("event line without a data line");
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("event:") {
                let name = rest.trim();
                if self.pending_event.is_some() {
                    return self.fail("event line without a data line");
                }
                if name.is_empty() {
                    return self.fail("empty event name");
                }
                // The line buffer is not reused here, but the name is still
                // stored as an owned copy before the next read.
                self.pending_event = Some(name.to_string());
                continue;
            }

            if let Some(rest) = line.strip_prefix("data:") {
                let data = rest.strip_prefix(' ').unwrap_or(rest);
                if data.trim().eq_ignore_ascii_case(DONE_SENTINEL) {
                    self.finished = true;
                    return None;
                }
                if data.is_empty() {
                    self.pending_event = None;
                    continue;
                }
                return Some(Ok(SseFrame {
                    event: self.pending_event.take(),
                    data: data.to_string(),
                }));
            }

            // Comments (": keepalive") and fields we do not consume.
        }

        self.finished = true;
        if self.pending_event.take().is_some() {
            return Some(Err(SseFramerError::Protocol(
                "stream ended after an event line with no data".to_string(),
            )));
        }
        None
    }
}
