//! Incremental `text/event-stream` decoder.
//!
//! The decoder pulls chunks from a byte stream only when the caller asks for
//! the next event, so a slow consumer holds back the network read.

use crate::error::{McpSnagError, Result};
use futures::{Stream, StreamExt};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type. Empty means the default `message` type.
    pub event: String,
    /// `data` lines joined with `\n` in arrival order.
    pub data: String,
    pub id: String,
}

impl SseEvent {
    pub fn is_message(&self) -> bool {
        self.event.is_empty() || self.event == "message"
    }
}

pub struct SseDecoder<S> {
    stream: S,
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    pending: SseEvent,
    finished: bool,
}

impl<S, B, E> SseDecoder<S>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<McpSnagError>,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            scanned: 0,
            pending: SseEvent::default(),
            finished: false,
        }
    }

    /// Returns the next complete event, `Ok(None)` once the stream is
    /// exhausted. A read error is returned once and ends the sequence.
    pub async fn next_event(&mut self) -> Result<Option<SseEvent>> {
        loop {
            while let Some(line) = self.take_line() {
                if let Some(event) = self.process_line(&line) {
                    return Ok(Some(event));
                }
            }

            if self.finished {
                // A last line may arrive without its newline.
                if !self.buffer.is_empty() {
                    let tail = std::mem::take(&mut self.buffer);
                    self.scanned = 0;
                    let line = decode_line(&tail);
                    if let Some(event) = self.process_line(&line) {
                        return Ok(Some(event));
                    }
                }
                return Ok(self.flush());
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    self.finished = true;
                    self.buffer.clear();
                    self.scanned = 0;
                    self.pending = SseEvent::default();
                    return Err(e.into());
                }
                None => self.finished = true,
            }
        }
    }

    /// Adapts the decoder into a `Stream` of events.
    pub fn into_stream(self) -> impl Stream<Item = Result<SseEvent>> {
        futures::stream::unfold(self, |mut decoder| async move {
            match decoder.next_event().await {
                Ok(Some(event)) => Some((Ok(event), decoder)),
                Ok(None) => None,
                Err(e) => Some((Err(e), decoder)),
            }
        })
    }

    fn take_line(&mut self) -> Option<String> {
        let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            return None;
        };
        let newline = self.scanned + offset;
        self.scanned = 0;
        let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
        Some(decode_line(&raw[..newline]))
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            let event = std::mem::take(&mut self.pending);
            return if event.data.is_empty() {
                None
            } else {
                Some(event)
            };
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = line.split_once(':')?;
        let value = value.strip_prefix(' ').unwrap_or(value);

        match field {
            "event" => self.pending.event = value.to_string(),
            "data" => {
                if !self.pending.data.is_empty() {
                    self.pending.data.push('\n');
                }
                self.pending.data.push_str(value);
            }
            "id" => self.pending.id = value.to_string(),
            _ => {}
        }
        None
    }

    fn flush(&mut self) -> Option<SseEvent> {
        let event = std::mem::take(&mut self.pending);
        if event.data.is_empty() {
            None
        } else {
            Some(event)
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
