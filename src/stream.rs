//! Incremental decoding of streamed response bodies.
//!
//! Bytes arrive in arbitrary chunks; lines and multi-byte characters may be split
//! across chunk boundaries. The decoders here buffer raw bytes and only hand out
//! complete frames.

/// How a backend frames its streamed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFraming {
    /// One JSON document per line.
    JsonLines,
    /// `text/event-stream`: `data:` lines grouped into events by blank lines.
    ServerSentEvents,
}

/// What a single decoded frame contributed to the reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    pub text: Option<String>,
    pub done: bool,
    pub error: Option<String>,
    /// Reported as [`crate::error::ChatError::EmptyResult`] when this frame
    /// finishes a reply that has no text yet. `None` lets a textless finish
    /// complete with an empty response.
    pub empty_reason: Option<String>,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn finished(mut self, done: bool) -> Self {
        self.done = done;
        self
    }

    pub fn empty_reason(mut self, reason: impl Into<String>) -> Self {
        self.empty_reason = Some(reason.into());
        self
    }
}

/// Text accumulated for one in-flight call.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    text: String,
    done: bool,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment. Returns false when the fragment was empty.
    pub fn append(&mut self, fragment: &str) -> bool {
        if fragment.is_empty() {
            return false;
        }
        self.text.push_str(fragment);
        true
    }

    pub fn snapshot(&self) -> String {
        self.text.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn mark_done(&mut self) {
        self.done = true;
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[derive(Debug, Default)]
pub struct LineDecoder {
    pending: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&raw[..raw.len() - 1]));
        }
        lines
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        let line = decode_line(&raw);
        if line.trim().is_empty() { None } else { Some(line) }
    }
}

fn decode_line(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches('\r')
        .to_string()
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    lines: LineDecoder,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        for line in self.lines.push(chunk) {
            if let Some(event) = self.feed_line(&line) {
                events.push(event);
            }
        }
        events
    }

    pub fn finish(&mut self) -> Option<String> {
        if let Some(line) = self.lines.finish() {
            if let Some(event) = self.feed_line(&line) {
                return Some(event);
            }
        }
        self.take_event()
    }

    fn feed_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.take_event();
        }
        // Comments, `event:`, `id:` and `retry:` carry nothing we use.
        if let Some(data) = line.strip_prefix("data:") {
            self.data.push(data.trim_start().to_string());
        }
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.data).join("\n"))
        }
    }
}

/// Decoder for whichever framing a backend uses.
#[derive(Debug)]
pub enum FrameDecoder {
    JsonLines(LineDecoder),
    ServerSentEvents(SseDecoder),
}

impl FrameDecoder {
    pub fn new(framing: StreamFraming) -> Self {
        match framing {
            StreamFraming::JsonLines => FrameDecoder::JsonLines(LineDecoder::new()),
            StreamFraming::ServerSentEvents => FrameDecoder::ServerSentEvents(SseDecoder::new()),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        match self {
            FrameDecoder::JsonLines(decoder) => decoder.push(chunk),
            FrameDecoder::ServerSentEvents(decoder) => decoder.push(chunk),
        }
    }

    pub fn finish(&mut self) -> Option<String> {
        match self {
            FrameDecoder::JsonLines(decoder) => decoder.finish(),
            FrameDecoder::ServerSentEvents(decoder) => decoder.finish(),
        }
    }
}
